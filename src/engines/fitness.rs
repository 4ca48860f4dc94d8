use crate::config::FitnessConfig;
use crate::engines::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};

/// Scalar fitness plus the parts it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessScore {
    pub value: f64,
    /// Weighted return, drawdown and sharpe terms
    pub base: f64,
    /// Amount subtracted for constraint violations
    pub penalty: f64,
}

#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    config: FitnessConfig,
}

impl FitnessEvaluator {
    pub fn new(config: FitnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Higher is better. A genome that never traded scores exactly `no_trade_score`.
    pub fn score(&self, metrics: &PerformanceMetrics) -> FitnessScore {
        if metrics.num_trades == 0 {
            return self.failed();
        }

        let c = &self.config;
        let sharpe = if metrics.sharpe_ratio.is_finite() { metrics.sharpe_ratio } else { 0.0 };
        let base = c.return_weight * metrics.total_return - c.drawdown_weight * metrics.max_drawdown
            + c.sharpe_weight * sharpe;
        let penalty = c.violation_penalty * metrics.constraint_violations as f64;

        let value = base - penalty;
        if !value.is_finite() {
            return self.failed();
        }
        FitnessScore { value, base, penalty }
    }

    /// Score given to genomes that never traded or could not be evaluated
    pub fn failed(&self) -> FitnessScore {
        FitnessScore { value: self.config.no_trade_score, base: self.config.no_trade_score, penalty: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            total_return: 0.10,
            max_drawdown: 0.04,
            sharpe_ratio: 1.5,
            num_trades: 12,
            constraint_violations: 3,
            ..PerformanceMetrics::default()
        }
    }

    #[test]
    fn weighted_sum_minus_penalty() {
        let score = FitnessEvaluator::new(FitnessConfig::default()).score(&metrics());
        assert!((score.base - (0.10 - 0.04 + 0.15)).abs() < 1e-12);
        assert!((score.penalty - 0.003).abs() < 1e-12);
        assert!((score.value - (score.base - score.penalty)).abs() < 1e-12);
    }

    #[test]
    fn zero_trades_scores_exactly_no_trade_score() {
        let config = FitnessConfig { no_trade_score: -2.5, ..FitnessConfig::default() };
        let evaluator = FitnessEvaluator::new(config);
        let idle = PerformanceMetrics { num_trades: 0, constraint_violations: 40, ..metrics() };
        assert_eq!(evaluator.score(&idle).value, -2.5);
        assert_eq!(evaluator.failed().value, -2.5);
    }

    #[test]
    fn more_violations_never_score_higher() {
        let evaluator = FitnessEvaluator::new(FitnessConfig::default());
        let clean = evaluator.score(&PerformanceMetrics { constraint_violations: 0, ..metrics() });
        let dirty = evaluator.score(&metrics());
        assert!(clean.value > dirty.value);
    }
}
