use super::traits::{invalid, ConfigSection};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    pub starting_capital: f64,
    /// Upper bound on the number of bars a rule may look back over
    pub max_lookback: usize,
    /// Wall-clock budget for a single genome's backtest. Off by default: a run that
    /// hits it is no longer reproducible from its seed.
    pub evaluation_timeout_ms: Option<u64>,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            starting_capital: 10000.0,
            max_lookback: 250,
            evaluation_timeout_ms: None,
        }
    }
}

impl BacktestingConfig {
    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_ms.map(Duration::from_millis)
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), AetraderError> {
        if !(self.starting_capital > 0.0) || !self.starting_capital.is_finite() {
            return Err(invalid::<Self>("starting_capital must be positive"));
        }
        if self.max_lookback < 2 {
            return Err(invalid::<Self>("max_lookback must be at least 2"));
        }
        if self.evaluation_timeout_ms == Some(0) {
            return Err(invalid::<Self>("evaluation_timeout_ms must be positive"));
        }
        Ok(())
    }
}
