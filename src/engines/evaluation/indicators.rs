//! Indicator columns computed once per price series with polars rolling windows.
//!
//! Every expression only looks backwards: row `i` depends on closes `..=i`.
use crate::error::Result;
use crate::types::Candle;
use polars::prelude::*;
use std::collections::HashMap;

pub const CLOSE: &str = "close";

fn fixed_window(period: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: period,
        min_periods: period,
        ..Default::default()
    }
}

/// Simple moving average of the close; null until `period` bars exist.
pub fn sma(period: usize, name: &str) -> Expr {
    col(CLOSE).rolling_mean(fixed_window(period.max(1))).alias(name)
}

/// Cutler's RSI over the last `period` close-to-close changes, 50 when nothing moved.
pub fn rsi(period: usize, name: &str) -> Expr {
    let period = period.max(1);
    let change = col(CLOSE) - col(CLOSE).shift(lit(1));
    let gains = when(change.clone().gt(lit(0.0)))
        .then(change.clone())
        .otherwise(lit(0.0))
        .rolling_sum(fixed_window(period));
    let losses = when(change.clone().lt(lit(0.0)))
        .then(lit(0.0) - change)
        .otherwise(lit(0.0))
        .rolling_sum(fixed_window(period));
    let total = gains.clone() + losses;

    when(total.clone().eq(lit(0.0)))
        .then(lit(50.0))
        .otherwise(lit(100.0) * gains / total)
        .alias(name)
}

/// Named f64 columns aligned with the candles they were computed from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    columns: HashMap<String, Vec<f64>>,
    len: usize,
}

impl Indicators {
    /// Evaluates `exprs` over the close column of `candles`. Nulls become NaN.
    pub fn compute(candles: &[Candle], exprs: Vec<Expr>) -> Result<Self> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let frame = polars::df!(CLOSE => closes)?.lazy().select(exprs).collect()?;

        let mut columns = HashMap::with_capacity(frame.width());
        for column in frame.get_columns() {
            let values = column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            columns.insert(column.name().to_string(), values);
        }

        Ok(Self { columns, len: candles.len() })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, index: usize) -> IndicatorRow<'_> {
        IndicatorRow { indicators: self, index }
    }
}

/// One bar's view of the indicator columns
#[derive(Debug, Clone, Copy)]
pub struct IndicatorRow<'a> {
    indicators: &'a Indicators,
    index: usize,
}

impl IndicatorRow<'_> {
    /// `None` for unknown columns, rows past the end and warm-up nulls
    pub fn get(&self, name: &str) -> Option<f64> {
        self.indicators
            .columns
            .get(name)
            .and_then(|values| values.get(self.index))
            .copied()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn sma_warms_up_then_averages() {
        let ind = Indicators::compute(&candles(&[1.0, 2.0, 3.0, 4.0]), vec![sma(2, "sma")]).unwrap();
        assert_eq!(ind.len(), 4);
        assert_eq!(ind.row(0).get("sma"), None);
        assert_eq!(ind.row(1).get("sma"), Some(1.5));
        assert_eq!(ind.row(3).get("sma"), Some(3.5));
        assert_eq!(ind.row(4).get("sma"), None);
        assert_eq!(ind.row(3).get("missing"), None);
    }

    #[test]
    fn rsi_extremes_and_flat() {
        let exprs = || vec![rsi(3, "rsi")];
        let up = Indicators::compute(&candles(&[1.0, 2.0, 3.0, 4.0]), exprs()).unwrap();
        assert_eq!(up.row(3).get("rsi"), Some(100.0));

        let down = Indicators::compute(&candles(&[4.0, 3.0, 2.0, 1.0]), exprs()).unwrap();
        assert_eq!(down.row(3).get("rsi"), Some(0.0));

        let flat = Indicators::compute(&candles(&[1.0, 1.0, 1.0, 1.0]), exprs()).unwrap();
        assert_eq!(flat.row(3).get("rsi"), Some(50.0));

        let mixed = Indicators::compute(&candles(&[10.0, 12.0, 11.0, 14.0]), exprs()).unwrap();
        let value = mixed.row(3).get("rsi").unwrap();
        assert!((value - 100.0 * 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn rows_never_see_later_bars() {
        let closes = [5.0, 6.0, 4.0, 7.0, 3.0, 8.0];
        let full = Indicators::compute(&candles(&closes), vec![sma(3, "sma"), rsi(2, "rsi")]).unwrap();
        let prefix = Indicators::compute(&candles(&closes[..4]), vec![sma(3, "sma"), rsi(2, "rsi")]).unwrap();
        for name in ["sma", "rsi"] {
            let (a, b) = (full.row(3).get(name).unwrap(), prefix.row(3).get(name).unwrap());
            assert!((a - b).abs() < 1e-9);
        }
    }
}
