use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::DEFAULT_ALGORITHM;

/// A hashing algorithm the farm can point its hardware at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Algorithm {
    pub id: String,
    pub name: String,
    /// Drifts over time; always > 0 since it divides the block requirement.
    pub difficulty: f64,
    pub reward_mult: f64,
}

impl Algorithm {
    fn new(id: &str, name: &str, difficulty: f64, reward_mult: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            difficulty,
            reward_mult,
        }
    }
}

/// Display grouping for the shop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "GPU")]
    Gpu,
    #[serde(rename = "ASIC")]
    Asic,
    #[serde(rename = "PRO")]
    Pro,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Category::Gpu => "GPU",
            Category::Asic => "ASIC",
            Category::Pro => "PRO",
        };
        f.write_str(tag)
    }
}

/// Immutable template for a purchasable mining device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HardwareSpec {
    pub id: String,
    pub name: String,
    pub base_cost: f64,
    /// Hash progress contributed per second, per unit.
    pub rate: f64,
    pub watts: f64,
    #[serde(rename = "type")]
    pub category: Category,
}

impl HardwareSpec {
    fn new(id: &str, name: &str, base_cost: f64, rate: f64, watts: f64, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_cost,
            rate,
            watts,
            category,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no algorithms")]
    NoAlgorithms,
    #[error("duplicate catalog id `{0}`")]
    DuplicateId(String),
    #[error("algorithm `{id}` has invalid difficulty {difficulty}")]
    InvalidDifficulty { id: String, difficulty: f64 },
    #[error("`{id}` has invalid {field} {value}")]
    InvalidValue {
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("default algorithm `{0}` is not in the catalog")]
    UnknownDefault(String),
    #[error("cannot read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered table of algorithms and hardware. Iteration order is the
/// insertion order and is relied on for tie-breaking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub algorithms: Vec<Algorithm>,
    pub hardware: Vec<HardwareSpec>,
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,
}

fn default_algorithm() -> String {
    DEFAULT_ALGORITHM.to_string()
}

impl Default for Catalog {
    fn default() -> Self {
        Self::reference()
    }
}

impl Catalog {
    /// The built-in data set: five algorithms, sixteen hardware tiers.
    pub fn reference() -> Self {
        use Category::{Asic, Gpu, Pro};

        let algorithms = vec![
            Algorithm::new("SHA-256", "SHA-256 (BTC)", 1.0, 1.0),
            Algorithm::new("Ethash", "Ethash (ETH)", 0.8, 0.75),
            Algorithm::new("Scrypt", "Scrypt (LTC)", 0.5, 0.45),
            Algorithm::new("Kawpow", "Kawpow (RVN)", 0.6, 0.6),
            Algorithm::new("RandomX", "RandomX (XMR)", 0.3, 0.3),
        ];

        let hardware = vec![
            // Starter
            HardwareSpec::new("gpu_1", "GTX 1660 Super", 150.0, 30.0, 125.0, Gpu),
            HardwareSpec::new("gpu_2", "RTX 3060 Ti", 450.0, 60.0, 200.0, Gpu),
            HardwareSpec::new("gpu_3", "RTX 4090", 1600.0, 150.0, 450.0, Gpu),
            // Advanced GPU
            HardwareSpec::new("gpu_4", "RTX 5090 Ti Prototype", 3500.0, 350.0, 600.0, Gpu),
            HardwareSpec::new("gpu_5", "NVIDIA H100 Cluster", 30000.0, 2500.0, 700.0, Gpu),
            HardwareSpec::new("gpu_6", "Quantum GPU Core", 85000.0, 8000.0, 1200.0, Gpu),
            // ASIC
            HardwareSpec::new("asic_1", "Antminer S19", 2500.0, 1100.0, 3250.0, Asic),
            HardwareSpec::new("asic_2", "Antminer S21 Hydro", 6500.0, 3500.0, 5000.0, Asic),
            // Industrial ASIC
            HardwareSpec::new("asic_3", "WhatsMiner M60S++", 15000.0, 9000.0, 6500.0, Asic),
            HardwareSpec::new("asic_4", "Bitmain E9 Pro Max", 45000.0, 28000.0, 8000.0, Asic),
            HardwareSpec::new("asic_5", "Mars Rover Miner", 120000.0, 85000.0, 12000.0, Asic),
            HardwareSpec::new("asic_6", "Dyson Sphere Node", 500000.0, 400000.0, 50000.0, Asic),
            // Endgame
            HardwareSpec::new("pro_1", "Mining Container", 150000.0, 120000.0, 25000.0, Pro),
            HardwareSpec::new("pro_2", "Geothermal Plant", 1200000.0, 1000000.0, 150000.0, Pro),
            HardwareSpec::new("pro_3", "Fusion Reactor Rig", 5000000.0, 4500000.0, 400000.0, Pro),
            HardwareSpec::new("pro_4", "Alien AI Core", 99999999.0, 99000000.0, 1000000.0, Pro),
        ];

        Self {
            algorithms,
            hardware,
            default_algorithm: default_algorithm(),
        }
    }

    /// Load an externally supplied table and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject data the engine cannot run on (zero difficulty, duplicates, ...).
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.algorithms.is_empty() {
            return Err(CatalogError::NoAlgorithms);
        }

        let mut seen = HashSet::new();
        for algo in &self.algorithms {
            if !seen.insert(algo.id.as_str()) {
                return Err(CatalogError::DuplicateId(algo.id.clone()));
            }
            if !algo.difficulty.is_finite() || algo.difficulty <= 0.0 {
                return Err(CatalogError::InvalidDifficulty {
                    id: algo.id.clone(),
                    difficulty: algo.difficulty,
                });
            }
            check_non_negative(&algo.id, "reward multiplier", algo.reward_mult)?;
        }

        let mut seen = HashSet::new();
        for hw in &self.hardware {
            if !seen.insert(hw.id.as_str()) {
                return Err(CatalogError::DuplicateId(hw.id.clone()));
            }
            check_non_negative(&hw.id, "cost", hw.base_cost)?;
            check_non_negative(&hw.id, "rate", hw.rate)?;
            check_non_negative(&hw.id, "watts", hw.watts)?;
        }

        if self.algorithm(&self.default_algorithm).is_none() {
            return Err(CatalogError::UnknownDefault(self.default_algorithm.clone()));
        }
        Ok(())
    }

    pub fn algorithm(&self, id: &str) -> Option<&Algorithm> {
        self.algorithms.iter().find(|a| a.id == id)
    }

    pub fn hardware(&self, id: &str) -> Option<&HardwareSpec> {
        self.hardware.iter().find(|h| h.id == id)
    }
}

fn check_non_negative(id: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidValue {
            id: id.to_string(),
            field,
            value,
        })
    }
}
