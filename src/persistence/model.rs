use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::Category;
use crate::engine::EconomyEngine;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cannot write save file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode save data: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAlgorithm {
    #[serde(default)]
    pub name: String,
    pub difficulty: f64,
    pub reward_mult: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedUpgrade {
    #[serde(default)]
    pub name: String,
    /// Current inflated price.
    pub cost: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub watts: f64,
    pub count: u32,
    #[serde(rename = "type", default)]
    pub category: Option<Category>,
}

/// On-disk shape of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub wallet: f64,
    pub current_algo: String,
    #[serde(default)]
    pub algorithms: BTreeMap<String, SavedAlgorithm>,
    #[serde(default)]
    pub upgrades: BTreeMap<String, SavedUpgrade>,
}

impl SaveData {
    pub fn capture(engine: &EconomyEngine) -> Self {
        let algorithms = engine
            .algorithms()
            .into_iter()
            .map(|a| {
                (
                    a.id,
                    SavedAlgorithm {
                        name: a.name,
                        difficulty: a.difficulty,
                        reward_mult: a.reward_mult,
                    },
                )
            })
            .collect();
        let upgrades = engine
            .hardware()
            .into_iter()
            .map(|h| {
                (
                    h.id,
                    SavedUpgrade {
                        name: h.name,
                        cost: h.price,
                        rate: h.rate,
                        watts: h.watts,
                        count: h.count,
                        category: Some(h.category),
                    },
                )
            })
            .collect();

        Self {
            wallet: engine.wallet(),
            current_algo: engine.current_algorithm().id,
            algorithms,
            upgrades,
        }
    }

    /// Check everything the engine would reject before touching it.
    fn check(&self, engine: &EconomyEngine) -> Result<(), String> {
        if !self.wallet.is_finite() {
            return Err(format!("wallet is not a number: {}", self.wallet));
        }
        if engine.catalog().algorithm(&self.current_algo).is_none() {
            return Err(format!("unknown current algorithm `{}`", self.current_algo));
        }
        for (id, algo) in &self.algorithms {
            if !algo.difficulty.is_finite() || algo.difficulty <= 0.0 {
                return Err(format!("algorithm `{id}` has difficulty {}", algo.difficulty));
            }
        }
        for (id, up) in &self.upgrades {
            if !up.cost.is_finite() || up.cost < 0.0 {
                return Err(format!("upgrade `{id}` has cost {}", up.cost));
            }
        }
        Ok(())
    }

    /// Copy saved values into the engine. Unknown ids are skipped; static
    /// fields (rate, watts, names, reward) stay as the catalog defines them.
    fn apply(&self, engine: &mut EconomyEngine) {
        engine.restore_wallet(self.wallet);
        for (id, algo) in &self.algorithms {
            engine.restore_difficulty(id, algo.difficulty);
        }
        for (id, up) in &self.upgrades {
            engine.restore_owned(id, up.count, up.cost);
        }
        engine.restore_algorithm(&self.current_algo);
    }
}

/// How a load attempt ended. Neither case is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    DefaultsUsed(String),
}

/// JSON file store for one game.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, engine: &EconomyEngine) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&SaveData::capture(engine))?;
        fs::write(&self.path, json).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!("saved game to {}", self.path.display());
        Ok(())
    }

    /// Restore a saved game into `engine`. On any problem the engine is
    /// left as it was and the reason is returned.
    pub fn load_into(&self, engine: &mut EconomyEngine) -> LoadOutcome {
        match self.read(engine) {
            Ok(data) => {
                data.apply(engine);
                info!(
                    "loaded {} (wallet ${:.2}, algo {})",
                    self.path.display(),
                    data.wallet,
                    data.current_algo
                );
                LoadOutcome::Loaded
            }
            Err(reason) => {
                warn!("starting fresh game: {reason}");
                LoadOutcome::DefaultsUsed(reason)
            }
        }
    }

    fn read(&self, engine: &EconomyEngine) -> Result<SaveData, String> {
        if !self.path.exists() {
            return Err(format!("no save file at {}", self.path.display()));
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| format!("cannot read {}: {e}", self.path.display()))?;
        let data: SaveData = serde_json::from_str(&raw)
            .map_err(|e| format!("corrupt save {}: {e}", self.path.display()))?;
        data.check(engine)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    use super::{LoadOutcome, SaveData, SaveStore};
    use crate::catalog::Catalog;
    use crate::engine::{EconomyEngine, EconomyParams, ManualClock};

    fn engine(clock: &ManualClock) -> EconomyEngine {
        EconomyEngine::new(
            Catalog::reference(),
            EconomyParams::default(),
            Box::new(clock.clone()),
        )
        .unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hashfarm-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn missing_file_uses_defaults() {
        let clock = ManualClock::new(0.0);
        let mut e = engine(&clock);
        let store = SaveStore::new(temp_path("missing"));
        assert!(matches!(store.load_into(&mut e), LoadOutcome::DefaultsUsed(_)));
        assert_eq!(e.wallet(), 1000.0);
    }

    #[test]
    fn corrupt_file_uses_defaults() {
        let clock = ManualClock::new(0.0);
        let mut e = engine(&clock);
        let path = temp_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();

        let outcome = SaveStore::new(&path).load_into(&mut e);
        assert!(matches!(outcome, LoadOutcome::DefaultsUsed(reason) if reason.contains("corrupt")));
        assert_eq!(e.wallet(), 1000.0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unknown_algorithm_uses_defaults() {
        let clock = ManualClock::new(0.0);
        let mut e = engine(&clock);
        let path = temp_path("bad-algo");
        std::fs::write(&path, r#"{"wallet": 5.0, "current_algo": "Blake3"}"#).unwrap();

        assert!(matches!(
            SaveStore::new(&path).load_into(&mut e),
            LoadOutcome::DefaultsUsed(_)
        ));
        assert_eq!(e.wallet(), 1000.0);
        assert_eq!(e.current_algorithm().id, "SHA-256");
        std::fs::remove_file(&path).unwrap();
    }

    /// Write `json` as the save file and assert the load is refused whole.
    fn assert_rejected(name: &str, json: &str) {
        let clock = ManualClock::new(0.0);
        let mut e = engine(&clock);
        let path = temp_path(name);
        std::fs::write(&path, json).unwrap();

        let outcome = SaveStore::new(&path).load_into(&mut e);
        assert!(matches!(outcome, LoadOutcome::DefaultsUsed(_)), "{name}: {outcome:?}");
        assert_eq!(e.wallet(), 1000.0);
        assert_eq!(e.current_algorithm().id, "SHA-256");
        assert_eq!(e.algorithms(), engine(&clock).algorithms());
        assert!(e.hardware().iter().all(|h| h.count == 0));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn zero_difficulty_rejects_save() {
        assert_rejected(
            "zero-difficulty",
            r#"{
                "wallet": 5.0,
                "current_algo": "Scrypt",
                "algorithms": {
                    "Scrypt": {"difficulty": 0.0, "reward_mult": 0.45},
                    "Ethash": {"difficulty": 0.9, "reward_mult": 0.75}
                },
                "upgrades": {"gpu_1": {"cost": 172.0, "count": 1}}
            }"#,
        );
    }

    #[test]
    fn negative_cost_rejects_save() {
        assert_rejected(
            "negative-cost",
            r#"{
                "wallet": 5.0,
                "current_algo": "Scrypt",
                "algorithms": {"Scrypt": {"difficulty": 0.4, "reward_mult": 0.45}},
                "upgrades": {"gpu_1": {"cost": -1.0, "count": 1}}
            }"#,
        );
    }

    #[test]
    fn negative_count_rejects_save() {
        assert_rejected(
            "negative-count",
            r#"{
                "wallet": 5.0,
                "current_algo": "Scrypt",
                "upgrades": {"gpu_1": {"cost": 172.0, "count": 1}, "gpu_2": {"cost": 517.0, "count": -1}}
            }"#,
        );
    }

    #[test]
    fn out_of_range_wallet_rejects_save() {
        assert_rejected("huge-wallet", r#"{"wallet": 1e400, "current_algo": "Scrypt"}"#);
    }

    #[test]
    fn save_and_load_restore_progression() {
        let clock = ManualClock::new(0.0);
        let path = temp_path("roundtrip");
        let store = SaveStore::new(&path);

        let mut e = engine(&clock).with_store(store.clone());
        e.purchase("gpu_1").unwrap();
        e.purchase("gpu_1").unwrap();
        e.select_algorithm("Kawpow").unwrap();
        clock.advance(301.0);
        e.tick(false, &mut StdRng::seed_from_u64(3)).unwrap();
        store.save(&e).unwrap();

        let mut fresh = engine(&clock);
        assert_eq!(store.load_into(&mut fresh), LoadOutcome::Loaded);
        assert!((fresh.wallet() - e.wallet()).abs() < 1e-9);
        assert_eq!(fresh.current_algorithm().id, "Kawpow");
        for (got, want) in fresh.algorithms().iter().zip(e.algorithms()) {
            assert_eq!(got.id, want.id);
            assert!((got.difficulty - want.difficulty).abs() < 1e-12);
        }
        // drift moved at least one difficulty away from the catalog value
        let reference = Catalog::reference();
        assert!(
            fresh
                .algorithms()
                .iter()
                .zip(&reference.algorithms)
                .any(|(a, b)| a.difficulty != b.difficulty)
        );
        let gpu = fresh.hardware_item("gpu_1").unwrap();
        assert_eq!(gpu.count, 2);
        assert_eq!(gpu.price, 197.0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn purchase_writes_save_file() {
        let clock = ManualClock::new(0.0);
        let path = temp_path("purchase");
        let mut e = engine(&clock).with_store(SaveStore::new(&path));
        e.purchase("gpu_2").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let data: SaveData = serde_json::from_str(&raw).unwrap();
        assert_eq!(data.wallet, 550.0);
        assert_eq!(data.upgrades["gpu_2"].count, 1);
        assert_eq!(data.upgrades["gpu_2"].cost, 517.0);
        assert_eq!(data.current_algo, "SHA-256");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn static_fields_come_from_catalog() {
        let clock = ManualClock::new(0.0);
        let mut e = engine(&clock);
        let path = temp_path("static");
        let json = r#"{
            "wallet": 42.0,
            "current_algo": "Ethash",
            "algorithms": {"Ethash": {"difficulty": 0.9, "reward_mult": 99.0}},
            "upgrades": {"gpu_1": {"cost": 172.0, "count": 1, "rate": 1e9}, "ghost": {"cost": 1.0, "count": 5}}
        }"#;
        std::fs::write(&path, json).unwrap();

        assert_eq!(SaveStore::new(&path).load_into(&mut e), LoadOutcome::Loaded);
        assert_eq!(e.wallet(), 42.0);
        let algo = e.current_algorithm();
        assert_eq!(algo.difficulty, 0.9);
        assert_eq!(algo.reward_mult, 0.75);
        assert_eq!(e.total_hash_rate(), 30.0);
        std::fs::remove_file(&path).unwrap();
    }
}
