use super::traits::{invalid, ConfigSection};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};

/// Weights of the scalar fitness. Returns and drawdowns are fractions, not percents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub return_weight: f64,
    pub drawdown_weight: f64,
    pub sharpe_weight: f64,
    /// Subtracted once per risk rejection or halt
    pub violation_penalty: f64,
    /// Score of genomes that never trade or whose evaluation failed
    pub no_trade_score: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            return_weight: 1.0,
            drawdown_weight: 1.0,
            sharpe_weight: 0.1,
            violation_penalty: 0.001,
            no_trade_score: -1.0,
        }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), AetraderError> {
        let values = [
            self.return_weight,
            self.drawdown_weight,
            self.sharpe_weight,
            self.violation_penalty,
            self.no_trade_score,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid::<Self>("weights and scores must be finite"));
        }
        if self.drawdown_weight < 0.0 || self.violation_penalty < 0.0 {
            return Err(invalid::<Self>(
                "drawdown_weight and violation_penalty must be non-negative",
            ));
        }
        Ok(())
    }
}
