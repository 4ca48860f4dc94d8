use super::traits::{invalid, ConfigSection};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};

/// Hard trading limits. Built once at startup, validated, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Fraction of available capital a single position may use
    pub max_position_size: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Fraction of starting capital that may be lost within one trading day
    pub max_daily_loss: f64,
    /// Fee charged on each leg, as a fraction of notional
    pub trading_fee: f64,
    pub min_order_notional: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: 0.1,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.05,
            max_daily_loss: 0.03,
            trading_fee: 0.001,
            min_order_notional: 1.0,
        }
    }
}

impl ConfigSection for RiskLimits {
    fn section_name() -> &'static str {
        "risk"
    }

    fn validate(&self) -> Result<(), AetraderError> {
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            return Err(invalid::<Self>("max_position_size must be in (0, 1]"));
        }
        if !(self.stop_loss_pct > 0.0) {
            return Err(invalid::<Self>("stop_loss_pct must be positive"));
        }
        if !(self.take_profit_pct > self.stop_loss_pct) {
            return Err(invalid::<Self>(
                "take_profit_pct must be greater than stop_loss_pct",
            ));
        }
        if self.stop_loss_pct >= 1.0 {
            return Err(invalid::<Self>("stop_loss_pct must be below 1"));
        }
        if !(self.max_daily_loss > 0.0) {
            return Err(invalid::<Self>("max_daily_loss must be positive"));
        }
        if !(self.trading_fee >= 0.0 && self.trading_fee < 1.0) {
            return Err(invalid::<Self>("trading_fee must be in [0, 1)"));
        }
        if !(self.min_order_notional >= 0.0) {
            return Err(invalid::<Self>("min_order_notional must be non-negative"));
        }
        Ok(())
    }
}
