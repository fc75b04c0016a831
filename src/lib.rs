//! Idle crypto-mining economy: a tick engine over a hardware catalog,
//! JSON save files and two terminal front-ends.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod persistence;
pub mod ui;
