use log::{debug, info};
use rand::Rng;
use serde::Serialize;

use super::{EconomyEngine, EngineError};

/// Outcome of one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickResult {
    pub wallet: f64,
    pub progress: f64,
    pub block_requirement: f64,
    pub algorithm: String,
    pub blocks: u64,
    pub revenue: f64,
    pub expense: f64,
    /// Present only when auto-switch changed the algorithm this step.
    pub switch_notice: Option<String>,
}

impl TickResult {
    pub fn net(&self) -> f64 {
        self.revenue - self.expense
    }
}

impl EconomyEngine {
    /// Advance one second of simulated time.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        auto_switch: bool,
        rng: &mut R,
    ) -> Result<TickResult, EngineError> {
        self.advance(1.0, auto_switch, rng)
    }

    /// Advance `elapsed` seconds: drift, auto-switch, resolve blocks, pay OpEx.
    /// Hash progress and every expense term scale with `elapsed`.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        elapsed: f64,
        auto_switch: bool,
        rng: &mut R,
    ) -> Result<TickResult, EngineError> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(EngineError::InvalidElapsed(elapsed));
        }
        let now = self.clock.now();

        // Work out drift and switch first so a bad requirement leaves the engine untouched.
        let drift_due = now - self.last_drift > self.params.drift_interval_secs;
        let difficulties: Vec<f64> = if drift_due {
            self.drifted_difficulties(rng)
        } else {
            self.catalog.algorithms.iter().map(|a| a.difficulty).collect()
        };
        let switch_due =
            auto_switch && now - self.last_auto_switch > self.params.auto_switch_interval_secs;
        let target = if switch_due {
            self.best_algorithm_index(&difficulties)
        } else {
            self.current
        };

        let requirement = self.params.block_requirement_scale * difficulties[target];
        if !requirement.is_finite() || requirement <= 0.0 {
            return Err(EngineError::InvalidBlockRequirement {
                algorithm: self.catalog.algorithms[target].id.clone(),
                requirement,
            });
        }

        if drift_due {
            for (algo, difficulty) in self.catalog.algorithms.iter_mut().zip(&difficulties) {
                algo.difficulty = *difficulty;
            }
            self.last_drift = now;
        }

        let mut switch_notice = None;
        if switch_due {
            if target != self.current {
                let notice = format!(
                    "Auto-Switch: {} -> {} (Better Profit!)",
                    self.catalog.algorithms[self.current].id, self.catalog.algorithms[target].id
                );
                info!("{notice}");
                self.current = target;
                self.progress = 0.0;
                switch_notice = Some(notice);
            }
            self.last_auto_switch = now;
        }

        let algo = &self.catalog.algorithms[self.current];
        let block_reward = self.params.block_base_reward * algo.reward_mult;
        let algorithm = algo.id.clone();

        self.progress += self.total_hash_rate() * elapsed;
        let blocks = self.resolve_blocks(requirement);
        let revenue = blocks as f64 * block_reward;
        if blocks > 0 {
            debug!("mined {blocks} block(s) on {algorithm}, +{revenue:.2}");
        }

        let expense = self.expense_per_second() * elapsed;
        self.wallet += revenue - expense;

        Ok(TickResult {
            wallet: self.wallet,
            progress: self.progress,
            block_requirement: requirement,
            algorithm,
            blocks,
            revenue,
            expense,
            switch_notice,
        })
    }

    fn drifted_difficulties<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let (lo, hi) = (self.params.drift_min, self.params.drift_max);
        let drifted: Vec<f64> = self
            .catalog
            .algorithms
            .iter()
            .map(|a| a.difficulty * rng.gen_range(lo..=hi))
            .collect();
        debug!(
            "difficulty drift: {}",
            self.catalog
                .algorithms
                .iter()
                .zip(&drifted)
                .map(|(a, d)| format!("{}={d:.3}", a.id))
                .collect::<Vec<_>>()
                .join(" ")
        );
        drifted
    }

    /// Turn whole requirements of progress into blocks, leaving
    /// `0 <= progress < requirement`.
    fn resolve_blocks(&mut self, requirement: f64) -> u64 {
        if self.progress < requirement {
            return 0;
        }
        let mut whole = (self.progress / requirement).floor();
        let mut rest = self.progress - whole * requirement;
        // float rounding can land one block off either way
        if rest < 0.0 {
            whole -= 1.0;
            rest += requirement;
        }
        if rest >= requirement {
            whole += 1.0;
            rest -= requirement;
        }
        self.progress = rest.max(0.0);
        whole as u64
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    use crate::catalog::Catalog;
    use crate::engine::{EconomyEngine, EconomyParams, EngineError, ManualClock};

    fn engine_with_clock() -> (EconomyEngine, ManualClock) {
        let clock = ManualClock::new(1_000.0);
        let engine = EconomyEngine::new(
            Catalog::reference(),
            EconomyParams::default(),
            Box::new(clock.clone()),
        )
        .unwrap();
        (engine, clock)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn idle_tick_only_pays_network_fee() {
        let (mut e, _clock) = engine_with_clock();
        let r = e.tick(false, &mut rng()).unwrap();
        assert_eq!(r.revenue, 0.0);
        assert_eq!(r.blocks, 0);
        assert!((r.expense - 0.05).abs() < 1e-12);
        assert!((r.wallet - 999.95).abs() < 1e-9);
        assert_eq!(r.switch_notice, None);
    }

    #[test]
    fn boosts_resolve_on_next_tick() {
        let (mut e, _clock) = engine_with_clock();
        for _ in 0..5 {
            e.manual_boost();
        }
        // 2500 progress on SHA-256 (requirement 1000) -> 2 blocks, 500 left
        let r = e.tick(false, &mut rng()).unwrap();
        assert_eq!(r.blocks, 2);
        assert_eq!(r.revenue, 20.0);
        assert_eq!(r.progress, 500.0);
        assert_eq!(r.block_requirement, 1000.0);
    }

    #[test]
    fn hash_rate_accumulates_and_expenses_are_charged() {
        let (mut e, _clock) = engine_with_clock();
        e.purchase("gpu_1").unwrap();
        let mut blocks = 0;
        for _ in 0..34 {
            blocks += e.tick(false, &mut rng()).unwrap().blocks;
        }
        // 34 * 30 = 1020 progress -> exactly one block
        assert_eq!(blocks, 1);
        assert!((e.progress() - 20.0).abs() < 1e-9);

        let per_sec = 125.0 / 1000.0 * 0.12 / 3600.0 + 0.05 + 172.0 * 0.15 / 3600.0;
        assert!((e.expense_per_second() - per_sec).abs() < 1e-12);
        let expected_wallet = 850.0 + 10.0 - 34.0 * per_sec;
        assert!((e.wallet() - expected_wallet).abs() < 1e-6);
    }

    #[test]
    fn advance_scales_progress_and_expense() {
        let (mut e, _clock) = engine_with_clock();
        e.purchase("gpu_1").unwrap();
        let one = e.expense_per_second();
        let r = e.advance(0.5, false, &mut rng()).unwrap();
        assert!((r.expense - one * 0.5).abs() < 1e-12);
        assert_eq!(r.progress, 15.0);

        assert_eq!(
            e.advance(-1.0, false, &mut rng()),
            Err(EngineError::InvalidElapsed(-1.0))
        );
    }

    #[test]
    fn wallet_may_go_negative() {
        let (mut e, _clock) = engine_with_clock();
        e.restore_wallet(0.01);
        let r = e.tick(false, &mut rng()).unwrap();
        assert!(r.wallet < 0.0);
    }

    #[test]
    fn progress_stays_below_requirement_after_every_tick() {
        let (mut e, clock) = engine_with_clock();
        e.restore_wallet(10_000_000.0);
        for id in ["gpu_1", "asic_1", "asic_2", "pro_1", "gpu_5"] {
            e.purchase(id).unwrap();
        }
        let mut rng = rng();
        for i in 0..2_000 {
            if i % 7 == 0 {
                e.manual_boost();
            }
            clock.advance(13.0);
            let r = e.tick(true, &mut rng).unwrap();
            assert!(r.progress >= 0.0);
            assert!(r.progress < r.block_requirement);
            assert_eq!(r.block_requirement, e.block_requirement());
        }
    }

    #[test]
    fn drift_waits_for_interval_and_stays_in_bounds() {
        let (mut e, clock) = engine_with_clock();
        let before: Vec<f64> = e.algorithms().iter().map(|a| a.difficulty).collect();

        clock.advance(300.0);
        e.tick(false, &mut rng()).unwrap();
        let same: Vec<f64> = e.algorithms().iter().map(|a| a.difficulty).collect();
        assert_eq!(before, same);

        clock.advance(1.0);
        e.tick(false, &mut rng()).unwrap();
        for (old, algo) in before.iter().zip(e.algorithms()) {
            let factor = algo.difficulty / old;
            assert!((0.95 - 1e-12..=1.10 + 1e-12).contains(&factor));
        }
    }

    #[test]
    fn difficulty_stays_positive_after_many_drifts() {
        let (mut e, clock) = engine_with_clock();
        // StepRng(0, 0) always yields the low end of the range.
        let mut low = StepRng::new(0, 0);
        for _ in 0..500 {
            clock.advance(301.0);
            e.tick(false, &mut low).unwrap();
        }
        for algo in e.algorithms() {
            assert!(algo.difficulty > 0.0);
            assert!(algo.difficulty < 1.0);
        }
    }

    #[test]
    fn auto_switch_is_rate_limited_and_resets_progress() {
        let (mut e, clock) = engine_with_clock();
        e.restore_difficulty("Scrypt", 0.3);
        e.manual_boost();

        // not yet 60s since construction
        let r = e.tick(true, &mut rng()).unwrap();
        assert_eq!(r.switch_notice, None);
        assert_eq!(r.algorithm, "SHA-256");

        clock.advance(61.0);
        let r = e.tick(true, &mut rng()).unwrap();
        assert_eq!(
            r.switch_notice.as_deref(),
            Some("Auto-Switch: SHA-256 -> Scrypt (Better Profit!)")
        );
        assert_eq!(r.algorithm, "Scrypt");
        assert_eq!(r.progress, 0.0);
        assert!((r.block_requirement - 300.0).abs() < 1e-9);

        // a better choice appears but the evaluation timer was just reset
        e.restore_difficulty("RandomX", 0.1);
        clock.advance(30.0);
        assert_eq!(e.tick(true, &mut rng()).unwrap().switch_notice, None);
        clock.advance(31.0);
        let r = e.tick(true, &mut rng()).unwrap();
        assert_eq!(r.algorithm, "RandomX");
    }

    #[test]
    fn auto_switch_disabled_never_switches() {
        let (mut e, clock) = engine_with_clock();
        e.restore_difficulty("Scrypt", 0.3);
        clock.advance(120.0);
        let r = e.tick(false, &mut rng()).unwrap();
        assert_eq!(r.algorithm, "SHA-256");
    }

    #[test]
    fn blocks_are_paid_at_post_switch_algorithm() {
        let (mut e, clock) = engine_with_clock();
        e.restore_difficulty("RandomX", 0.125);
        e.restore_owned("gpu_1", 10, 150.0);
        clock.advance(61.0);
        // switch resets progress, then 300 hash vs requirement 125 -> 2 blocks of 3.0
        let r = e.tick(true, &mut rng()).unwrap();
        assert_eq!(r.algorithm, "RandomX");
        assert_eq!(r.blocks, 2);
        assert_eq!(r.progress, 50.0);
        assert!((r.revenue - 6.0).abs() < 1e-9);
    }

    #[test]
    fn failed_tick_leaves_engine_untouched() {
        let (mut e, clock) = engine_with_clock();
        e.restore_difficulty("SHA-256", 0.0);
        e.manual_boost();
        let before = e.algorithms();

        // both drift and auto-switch are due, but resolution cannot run
        clock.advance(301.0);
        assert!(matches!(
            e.tick(true, &mut rng()),
            Err(EngineError::InvalidBlockRequirement { .. })
        ));
        assert_eq!(e.algorithms(), before);
        assert_eq!(e.current_algorithm().id, "SHA-256");
        assert_eq!(e.progress(), 500.0);
        assert_eq!(e.wallet(), 1000.0);

        // timers were not consumed: the next good tick still drifts
        e.restore_difficulty("SHA-256", 1.0);
        e.tick(false, &mut rng()).unwrap();
        assert_ne!(e.algorithms()[4].difficulty, 0.3);
    }

    #[test]
    fn zero_difficulty_is_a_configuration_error() {
        let (mut e, _clock) = engine_with_clock();
        e.restore_difficulty("SHA-256", 0.0);
        e.manual_boost();
        assert!(matches!(
            e.tick(false, &mut rng()),
            Err(EngineError::InvalidBlockRequirement { .. })
        ));
    }
}
