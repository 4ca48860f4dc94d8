use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Required OHLCV columns for market data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl RequiredColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Timestamp,
            Self::Open,
            Self::High,
            Self::Low,
            Self::Close,
            Self::Volume,
        ]
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Timestamp => vec!["timestamp", "Timestamp", "time", "date", "datetime", "Date", "DateTime"],
            Self::Open => vec!["open", "Open", "OPEN", "o"],
            Self::High => vec!["high", "High", "HIGH", "h"],
            Self::Low => vec!["low", "Low", "LOW", "l"],
            Self::Close => vec!["close", "Close", "CLOSE", "c"],
            Self::Volume => vec!["volume", "Volume", "VOLUME", "vol", "Vol", "v"],
        }
    }

    pub fn is_price(&self) -> bool {
        !matches!(self, Self::Timestamp)
    }
}

/// What a market data collaborator is asked for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRequest {
    pub symbol: String,
    /// Bar spacing label, e.g. "1h" or "1d"
    pub interval: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DataRequest {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            start: None,
            end: None,
        }
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| *timestamp >= s) && self.end.map_or(true, |e| *timestamp <= e)
    }
}
