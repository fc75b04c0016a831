pub mod clock;
pub mod error;
pub mod model;
pub mod tick;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use model::{AlgorithmSnapshot, EconomyEngine, EconomyParams, HardwareSnapshot, Receipt};
pub use tick::TickResult;

/// Hash progress needed per block, multiplied by the algorithm difficulty.
pub const BLOCK_REQUIREMENT_SCALE: f64 = 1000.0;

/// Coins per block before the algorithm reward multiplier.
pub const BLOCK_BASE_REWARD: f64 = 10.0;

/// Seconds between difficulty drift events.
pub const DRIFT_INTERVAL_SECS: f64 = 300.0;

/// Bounds of the random factor applied to every difficulty on drift.
pub const DRIFT_MIN: f64 = 0.95;
pub const DRIFT_MAX: f64 = 1.10;

/// Seconds between auto-switch evaluations.
pub const AUTO_SWITCH_INTERVAL_SECS: f64 = 60.0;

/// Price multiplier applied after each purchase (result truncated).
pub const PRICE_INFLATION: f64 = 1.15;

/// Progress added by one manual boost, per unit of click power.
pub const BOOST_MULTIPLIER: f64 = 500.0;
