use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EconomyParams;
use crate::persistence::DEFAULT_SAVE_FILE;

/// Which front-end the launcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Shop,
    Dashboard,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "shop" | "gui" => Ok(Mode::Shop),
            "2" | "dashboard" | "afk" => Ok(Mode::Dashboard),
            other => Err(format!("unknown mode `{other}`")),
        }
    }
}

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub save_file: PathBuf,
    pub catalog_file: Option<PathBuf>,
    pub tick_interval: Duration,
    pub refresh_interval: Duration,
    pub mode: Option<Mode>,
    pub params: EconomyParams,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = EconomyParams::default();
        let params = EconomyParams {
            starting_wallet: parse_or(&lookup, "HASHFARM_STARTING_WALLET", defaults.starting_wallet),
            kwh_price: parse_or(&lookup, "HASHFARM_KWH_PRICE", defaults.kwh_price),
            network_fee_per_sec: parse_or(&lookup, "HASHFARM_NETWORK_FEE", defaults.network_fee_per_sec),
            maintenance_rate: parse_or(&lookup, "HASHFARM_MAINTENANCE_RATE", defaults.maintenance_rate),
            ..defaults
        };

        Self {
            save_file: lookup("HASHFARM_SAVE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_FILE)),
            catalog_file: lookup("HASHFARM_CATALOG_FILE").map(PathBuf::from),
            tick_interval: Duration::from_millis(parse_or::<u64>(&lookup, "HASHFARM_TICK_MS", 1000).max(1)),
            refresh_interval: Duration::from_millis(parse_or::<u64>(&lookup, "HASHFARM_REFRESH_MS", 100).max(1)),
            mode: lookup("HASHFARM_MODE").and_then(|v| match v.parse() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    warn!("HASHFARM_MODE: {e}, asking instead");
                    None
                }
            }),
            params,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{key}={raw:?} is not valid, using default");
            default
        }),
        None => default,
    }
}
