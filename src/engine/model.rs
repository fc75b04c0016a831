use log::{info, warn};
use serde::Serialize;

use super::{
    AUTO_SWITCH_INTERVAL_SECS, BLOCK_BASE_REWARD, BLOCK_REQUIREMENT_SCALE, BOOST_MULTIPLIER,
    Clock, DRIFT_INTERVAL_SECS, DRIFT_MAX, DRIFT_MIN, EngineError, PRICE_INFLATION,
};
use crate::catalog::{Algorithm, Catalog, CatalogError, Category};
use crate::persistence::SaveStore;

const SECS_PER_HOUR: f64 = 3600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Tunable economy knobs. Defaults reproduce the reference game.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomyParams {
    pub starting_wallet: f64,
    pub click_power: f64,
    pub boost_multiplier: f64,
    /// Electricity price per kWh.
    pub kwh_price: f64,
    pub network_fee_per_sec: f64,
    /// Share of inventory value spent on upkeep per maintenance cycle.
    pub maintenance_rate: f64,
    pub maintenance_cycle_secs: f64,
    pub price_inflation: f64,
    pub block_base_reward: f64,
    pub block_requirement_scale: f64,
    pub drift_interval_secs: f64,
    pub drift_min: f64,
    pub drift_max: f64,
    pub auto_switch_interval_secs: f64,
}

impl Default for EconomyParams {
    fn default() -> Self {
        Self {
            starting_wallet: 1000.0,
            click_power: 1.0,
            boost_multiplier: BOOST_MULTIPLIER,
            kwh_price: 0.12,
            network_fee_per_sec: 0.05,
            maintenance_rate: 0.15,
            maintenance_cycle_secs: SECS_PER_HOUR,
            price_inflation: PRICE_INFLATION,
            block_base_reward: BLOCK_BASE_REWARD,
            block_requirement_scale: BLOCK_REQUIREMENT_SCALE,
            drift_interval_secs: DRIFT_INTERVAL_SECS,
            drift_min: DRIFT_MIN,
            drift_max: DRIFT_MAX,
            auto_switch_interval_secs: AUTO_SWITCH_INTERVAL_SECS,
        }
    }
}

/// Mutable per-device record, parallel to `Catalog::hardware`.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedHardware {
    pub price: f64,
    pub count: u32,
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub id: String,
    pub name: String,
    pub price_paid: f64,
    pub count: u32,
    pub next_price: f64,
    pub wallet: f64,
}

impl Receipt {
    pub fn message(&self) -> String {
        format!(
            "Bought {} for ${:.0} (now own {}, next ${:.0})",
            self.name, self.price_paid, self.count, self.next_price
        )
    }
}

/// Read-only view of one catalog device plus ownership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareSnapshot {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub rate: f64,
    pub watts: f64,
    pub price: f64,
    pub count: u32,
    /// Estimated electricity + maintenance of the owned units per day.
    pub daily_opex: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmSnapshot {
    pub id: String,
    pub name: String,
    pub difficulty: f64,
    pub reward_mult: f64,
}

impl From<&Algorithm> for AlgorithmSnapshot {
    fn from(a: &Algorithm) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            difficulty: a.difficulty,
            reward_mult: a.reward_mult,
        }
    }
}

/// Single source of truth for the mining economy.
pub struct EconomyEngine {
    pub(super) catalog: Catalog,
    pub(super) params: EconomyParams,
    pub(super) owned: Vec<OwnedHardware>,
    pub(super) wallet: f64,
    /// Index into `catalog.algorithms`.
    pub(super) current: usize,
    pub(super) progress: f64,
    pub(super) last_drift: f64,
    pub(super) last_auto_switch: f64,
    pub(super) clock: Box<dyn Clock>,
    store: Option<SaveStore>,
}

impl EconomyEngine {
    /// Build a fresh game on a validated catalog. Both timers start at `clock.now()`.
    pub fn new(
        catalog: Catalog,
        params: EconomyParams,
        clock: Box<dyn Clock>,
    ) -> Result<Self, CatalogError> {
        catalog.validate()?;

        let current = catalog
            .algorithms
            .iter()
            .position(|a| a.id == catalog.default_algorithm)
            .ok_or_else(|| CatalogError::UnknownDefault(catalog.default_algorithm.clone()))?;
        let owned = catalog
            .hardware
            .iter()
            .map(|h| OwnedHardware {
                price: h.base_cost,
                count: 0,
            })
            .collect();
        let now = clock.now();

        Ok(Self {
            wallet: params.starting_wallet,
            catalog,
            params,
            owned,
            current,
            progress: 0.0,
            last_drift: now,
            last_auto_switch: now,
            clock,
            store: None,
        })
    }

    /// Attach a store that `purchase` saves to.
    pub fn with_store(mut self, store: SaveStore) -> Self {
        self.store = Some(store);
        self
    }

    /* ---------- Aggregates ---------- */

    pub fn total_hash_rate(&self) -> f64 {
        self.catalog
            .hardware
            .iter()
            .zip(&self.owned)
            .map(|(spec, own)| spec.rate * own.count as f64)
            .sum()
    }

    pub fn total_power_watts(&self) -> f64 {
        self.catalog
            .hardware
            .iter()
            .zip(&self.owned)
            .map(|(spec, own)| spec.watts * own.count as f64)
            .sum()
    }

    /// Replacement value: current (inflated) price times count.
    pub fn total_inventory_value(&self) -> f64 {
        self.owned.iter().map(|o| o.price * o.count as f64).sum()
    }

    /// OpEx for one second at the current fleet.
    pub fn expense_per_second(&self) -> f64 {
        let electricity = (self.total_power_watts() / 1000.0) * self.params.kwh_price / SECS_PER_HOUR;
        let maintenance =
            (self.total_inventory_value() * self.params.maintenance_rate) / self.params.maintenance_cycle_secs;
        electricity + self.params.network_fee_per_sec + maintenance
    }

    /* ---------- Getters ---------- */

    pub fn wallet(&self) -> f64 {
        self.wallet
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_algorithm(&self) -> AlgorithmSnapshot {
        AlgorithmSnapshot::from(&self.catalog.algorithms[self.current])
    }

    pub fn algorithms(&self) -> Vec<AlgorithmSnapshot> {
        self.catalog.algorithms.iter().map(AlgorithmSnapshot::from).collect()
    }

    /// Progress needed for one block on the current algorithm.
    pub fn block_requirement(&self) -> f64 {
        self.params.block_requirement_scale * self.catalog.algorithms[self.current].difficulty
    }

    pub fn hardware(&self) -> Vec<HardwareSnapshot> {
        self.catalog
            .hardware
            .iter()
            .zip(&self.owned)
            .map(|(spec, own)| {
                let count = own.count as f64;
                let maintenance =
                    own.price * self.params.maintenance_rate * count / self.params.maintenance_cycle_secs;
                let electricity = spec.watts * count / 1000.0 * self.params.kwh_price / SECS_PER_HOUR;
                HardwareSnapshot {
                    id: spec.id.clone(),
                    name: spec.name.clone(),
                    category: spec.category,
                    rate: spec.rate,
                    watts: spec.watts,
                    price: own.price,
                    count: own.count,
                    daily_opex: (maintenance + electricity) * SECS_PER_DAY,
                }
            })
            .collect()
    }

    pub fn hardware_item(&self, id: &str) -> Option<HardwareSnapshot> {
        let idx = self.hardware_index(id)?;
        self.hardware().into_iter().nth(idx)
    }

    /* ---------- Commands ---------- */

    /// Add boost progress. Blocks are resolved by the next tick.
    pub fn manual_boost(&mut self) -> f64 {
        self.progress += self.params.click_power * self.params.boost_multiplier;
        self.wallet
    }

    /// Buy one unit. On failure nothing changes. On success the attached
    /// store (if any) is saved.
    pub fn purchase(&mut self, id: &str) -> Result<Receipt, EngineError> {
        let idx = self
            .hardware_index(id)
            .ok_or_else(|| EngineError::UnknownHardware(id.to_string()))?;

        let price = self.owned[idx].price;
        if self.wallet < price {
            return Err(EngineError::InsufficientFunds {
                id: id.to_string(),
                price,
                wallet: self.wallet,
            });
        }

        self.wallet -= price;
        let item = &mut self.owned[idx];
        item.count += 1;
        item.price = (price * self.params.price_inflation).trunc();

        let receipt = Receipt {
            id: id.to_string(),
            name: self.catalog.hardware[idx].name.clone(),
            price_paid: price,
            count: item.count,
            next_price: item.price,
            wallet: self.wallet,
        };
        info!("{}", receipt.message());

        if let Some(store) = &self.store {
            if let Err(e) = store.save(self) {
                warn!("purchase of {id} committed but save failed: {e}");
            }
        }
        Ok(receipt)
    }

    /// Point the fleet at another algorithm. Progress resets only on an actual change.
    pub fn select_algorithm(&mut self, id: &str) -> Result<AlgorithmSnapshot, EngineError> {
        let idx = self
            .algorithm_index(id)
            .ok_or_else(|| EngineError::UnknownAlgorithm(id.to_string()))?;
        if idx != self.current {
            info!(
                "algorithm {} -> {}",
                self.catalog.algorithms[self.current].id, self.catalog.algorithms[idx].id
            );
            self.current = idx;
            self.progress = 0.0;
        }
        Ok(self.current_algorithm())
    }

    /// Id of the algorithm with the strictly best reward/difficulty ratio.
    /// Ties keep the earlier candidate, starting from the current one.
    pub fn best_algorithm(&self) -> &str {
        let difficulties: Vec<f64> = self.catalog.algorithms.iter().map(|a| a.difficulty).collect();
        &self.catalog.algorithms[self.best_algorithm_index(&difficulties)].id
    }

    /// Best index if the algorithms had `difficulties` (catalog order).
    pub(super) fn best_algorithm_index(&self, difficulties: &[f64]) -> usize {
        let score = |idx: usize| self.catalog.algorithms[idx].reward_mult / difficulties[idx];
        let mut best = self.current;
        let mut best_score = score(self.current);
        for idx in 0..self.catalog.algorithms.len() {
            if score(idx) > best_score {
                best = idx;
                best_score = score(idx);
            }
        }
        best
    }

    /* ---------- Restore hooks (persistence) ---------- */

    pub(crate) fn restore_wallet(&mut self, wallet: f64) {
        self.wallet = wallet;
    }

    pub(crate) fn restore_algorithm(&mut self, id: &str) -> bool {
        match self.algorithm_index(id) {
            Some(idx) => {
                self.current = idx;
                self.progress = 0.0;
                true
            }
            None => false,
        }
    }

    pub(crate) fn restore_difficulty(&mut self, id: &str, difficulty: f64) {
        if let Some(idx) = self.algorithm_index(id) {
            self.catalog.algorithms[idx].difficulty = difficulty;
        }
    }

    pub(crate) fn restore_owned(&mut self, id: &str, count: u32, price: f64) {
        if let Some(idx) = self.hardware_index(id) {
            self.owned[idx] = OwnedHardware { price, count };
        }
    }

    fn hardware_index(&self, id: &str) -> Option<usize> {
        self.catalog.hardware.iter().position(|h| h.id == id)
    }

    fn algorithm_index(&self, id: &str) -> Option<usize> {
        self.catalog.algorithms.iter().position(|a| a.id == id)
    }
}
