use crate::config::{DataConfig, GapPolicy};
use crate::error::{AetraderError, Result};
use crate::types::Candle;
use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesOptions {
    /// Expected spacing between consecutive bars
    pub interval: Option<Duration>,
    pub gap_policy: GapPolicy,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            interval: None,
            gap_policy: GapPolicy::Reject,
        }
    }
}

impl From<&DataConfig> for SeriesOptions {
    fn from(config: &DataConfig) -> Self {
        Self {
            interval: config.interval_secs.map(Duration::seconds),
            gap_policy: config.gap_policy,
        }
    }
}

/// Validated, strictly time-ordered candles for one symbol.
///
/// Construction drops malformed bars (never repairs them), refuses out-of-order
/// timestamps, and applies the gap policy. Once built the series is read-only and can
/// be shared between evaluation threads.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    candles: Vec<Candle>,
    rejected_bars: usize,
    filled_bars: usize,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, raw: Vec<Candle>, options: SeriesOptions) -> Result<Self> {
        let symbol = symbol.into();
        let mut candles: Vec<Candle> = Vec::with_capacity(raw.len());
        let mut rejected_bars = 0;
        let mut filled_bars = 0;

        for candle in raw {
            if !candle.is_well_formed() {
                log::warn!(
                    "{}: rejecting malformed bar at {} (o={} h={} l={} c={} v={})",
                    symbol, candle.timestamp, candle.open, candle.high, candle.low, candle.close, candle.volume
                );
                rejected_bars += 1;
                continue;
            }

            if let Some(prev) = candles.last().copied() {
                if candle.timestamp <= prev.timestamp {
                    return Err(AetraderError::MalformedMarketData(format!(
                        "{}: timestamps not strictly increasing ({} after {})",
                        symbol, candle.timestamp, prev.timestamp
                    )));
                }

                if let Some(interval) = options.interval {
                    if candle.timestamp - prev.timestamp > interval {
                        match options.gap_policy {
                            GapPolicy::Reject => {
                                return Err(AetraderError::MalformedMarketData(format!(
                                    "{}: gap between {} and {}",
                                    symbol, prev.timestamp, candle.timestamp
                                )));
                            }
                            GapPolicy::ForwardFill => {
                                let mut timestamp = prev.timestamp + interval;
                                while timestamp < candle.timestamp {
                                    candles.push(Candle {
                                        timestamp,
                                        open: prev.close,
                                        high: prev.close,
                                        low: prev.close,
                                        close: prev.close,
                                        volume: 0.0,
                                    });
                                    filled_bars += 1;
                                    timestamp = timestamp + interval;
                                }
                            }
                        }
                    }
                }
            }

            candles.push(candle);
        }

        if candles.is_empty() {
            return Err(AetraderError::MalformedMarketData(format!(
                "{}: no valid candles",
                symbol
            )));
        }
        if filled_bars > 0 {
            log::info!("{}: forward-filled {} missing bars", symbol, filled_bars);
        }

        Ok(Self {
            symbol,
            candles,
            rejected_bars,
            filled_bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn rejected_bars(&self) -> usize {
        self.rejected_bars
    }

    pub fn filled_bars(&self) -> usize {
        self.filled_bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(hour: u32, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn malformed_bar_is_dropped_not_fixed() {
        let mut bad = bar(1, 100.0);
        bad.high = 98.0;
        let series = PriceSeries::new("X", vec![bar(0, 100.0), bad, bar(2, 101.0)], SeriesOptions::default()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.rejected_bars(), 1);
        assert_eq!(series.candles()[1].close, 101.0);
    }

    #[test]
    fn out_of_order_timestamps_are_an_error() {
        let result = PriceSeries::new("X", vec![bar(2, 100.0), bar(1, 101.0)], SeriesOptions::default());
        assert!(matches!(result, Err(AetraderError::MalformedMarketData(_))));

        let duplicate = PriceSeries::new("X", vec![bar(1, 100.0), bar(1, 101.0)], SeriesOptions::default());
        assert!(duplicate.is_err());
    }

    #[test]
    fn gap_rejected_by_default_policy() {
        let options = SeriesOptions {
            interval: Some(Duration::hours(1)),
            gap_policy: GapPolicy::Reject,
        };
        assert!(PriceSeries::new("X", vec![bar(0, 100.0), bar(3, 101.0)], options).is_err());
    }

    #[test]
    fn gap_forward_filled_with_previous_close() {
        let options = SeriesOptions {
            interval: Some(Duration::hours(1)),
            gap_policy: GapPolicy::ForwardFill,
        };
        let series = PriceSeries::new("X", vec![bar(0, 100.0), bar(3, 101.0)], options).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.filled_bars(), 2);
        let filled = series.candles()[1];
        assert_eq!(filled.close, 100.0);
        assert_eq!(filled.high, 100.0);
        assert_eq!(filled.volume, 0.0);
        assert_eq!(filled.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(PriceSeries::new("X", Vec::new(), SeriesOptions::default()).is_err());
    }
}
