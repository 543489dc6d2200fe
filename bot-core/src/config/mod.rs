use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive range the per-action amounts are drawn from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AmountRange {
    fn default() -> Self {
        Self {
            min: 0.001,
            max: 0.0015,
        }
    }
}

impl AmountRange {
    pub fn sample(&self) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

/// Number of actions executed per transaction cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CyclePlan {
    pub swaps: u32,
    pub supplies: u32,
    pub withdraws: u32,
    pub borrows: u32,
    pub repays: u32,
}

impl Default for CyclePlan {
    fn default() -> Self {
        Self {
            swaps: 5,
            supplies: 2,
            withdraws: 2,
            borrows: 2,
            repays: 1,
        }
    }
}

/// Delay knobs for the sequential loop, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Delays {
    /// Randomized pause after each action.
    pub action_min_ms: u64,
    pub action_max_ms: u64,
    /// Fixed pause between wallets in the daily sweep.
    pub wallet_ms: u64,
    /// Fixed pause between repetitions in single-action mode.
    pub repeat_ms: u64,
    /// Outer countdown between daily sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            action_min_ms: 5_000,
            action_max_ms: 10_000,
            wallet_ms: 5_000,
            repeat_ms: 1_000,
            sweep_interval_secs: 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_range_sample_within_bounds() {
        let range = AmountRange {
            min: 0.001,
            max: 0.0015,
        };
        for _ in 0..100 {
            let v = range.sample();
            assert!(v >= range.min && v < range.max);
        }
    }

    #[test]
    fn amount_range_degenerate_returns_min() {
        let range = AmountRange { min: 0.5, max: 0.5 };
        assert_eq!(range.sample(), 0.5);
    }

    #[test]
    fn cycle_plan_defaults_match_daily_script() {
        let plan = CyclePlan::default();
        assert_eq!(plan.swaps, 5);
        assert_eq!(plan.supplies, 2);
        assert_eq!(plan.withdraws, 2);
        assert_eq!(plan.borrows, 2);
        assert_eq!(plan.repays, 1);
    }
}
