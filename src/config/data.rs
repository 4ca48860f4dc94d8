use super::traits::{invalid, ConfigSection};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapPolicy {
    Reject,
    ForwardFill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    /// Expected spacing between bars; gaps are only detected when set
    pub interval_secs: Option<i64>,
    pub gap_policy: GapPolicy,
    pub cache_ttl_secs: u64,
    pub min_rows: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSD".to_string(),
            interval_secs: None,
            gap_policy: GapPolicy::Reject,
            cache_ttl_secs: 300,
            min_rows: 50,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), AetraderError> {
        if self.symbol.trim().is_empty() {
            return Err(invalid::<Self>("symbol must not be empty"));
        }
        if matches!(self.interval_secs, Some(s) if s <= 0) {
            return Err(invalid::<Self>("interval_secs must be positive"));
        }
        if self.min_rows < 2 {
            return Err(invalid::<Self>("min_rows must be at least 2"));
        }
        Ok(())
    }
}
