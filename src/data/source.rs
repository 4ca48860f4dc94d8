use super::connectors::{CsvConnector, DataRequest};
use super::series::{PriceSeries, SeriesOptions};
use crate::error::{AetraderError, Result};
use crate::types::Candle;
use std::collections::HashMap;
use std::path::PathBuf;

/// Capability to supply a validated price series. The optimizer only ever sees
/// this trait; which backend sits behind it is decided at startup.
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, request: &DataRequest) -> Result<PriceSeries>;
}

/// Reads one CSV file per symbol from a directory (`<dir>/<symbol>.csv`), or a
/// single file regardless of symbol.
pub struct CsvSource {
    location: CsvLocation,
    options: SeriesOptions,
    min_rows: usize,
}

enum CsvLocation {
    File(PathBuf),
    Directory(PathBuf),
}

impl CsvSource {
    pub fn file(path: impl Into<PathBuf>, options: SeriesOptions) -> Self {
        Self {
            location: CsvLocation::File(path.into()),
            options,
            min_rows: 2,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, options: SeriesOptions) -> Self {
        Self {
            location: CsvLocation::Directory(path.into()),
            options,
            min_rows: 2,
        }
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        match &self.location {
            CsvLocation::File(path) => path.clone(),
            CsvLocation::Directory(dir) => dir.join(format!("{}.csv", symbol)),
        }
    }
}

impl MarketDataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, request: &DataRequest) -> Result<PriceSeries> {
        let path = self.path_for(&request.symbol);
        if !path.exists() {
            return Err(AetraderError::MarketDataUnavailable(format!(
                "No data file for {} at {}",
                request.symbol,
                path.display()
            )));
        }

        let (df, column_map) = CsvConnector::load_and_validate(&path, Some(self.min_rows))?;
        let candles: Vec<Candle> = CsvConnector::to_candles(&df, &column_map)?
            .into_iter()
            .filter(|c| request.contains(&c.timestamp))
            .collect();

        log::debug!("Loaded {} candles for {} from {}", candles.len(), request.symbol, path.display());
        PriceSeries::new(request.symbol.clone(), candles, self.options)
    }
}

/// Candles held in memory, keyed by symbol. Used for replays and tests.
#[derive(Default)]
pub struct InMemorySource {
    candles: HashMap<String, Vec<Candle>>,
    options: SeriesOptions,
}

impl InMemorySource {
    pub fn new(options: SeriesOptions) -> Self {
        Self {
            candles: HashMap::new(),
            options,
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, candles: Vec<Candle>) {
        self.candles.insert(symbol.into(), candles);
    }
}

impl MarketDataSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, request: &DataRequest) -> Result<PriceSeries> {
        let candles = self.candles.get(&request.symbol).ok_or_else(|| {
            AetraderError::MarketDataUnavailable(format!("Unknown symbol {}", request.symbol))
        })?;
        let selected = candles
            .iter()
            .filter(|c| request.contains(&c.timestamp))
            .copied()
            .collect();
        PriceSeries::new(request.symbol.clone(), selected, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    const CSV: &str = "timestamp,open,high,low,close,volume
2024-01-01,100,101,99,100.5,1000
2024-01-02,100.5,103,100,102,1500
2024-01-03,102,104,101,103,1200
2024-01-04,103,102,101,103,1200
";

    #[test]
    fn csv_source_drops_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ETHUSD.csv")).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let source = CsvSource::directory(dir.path(), SeriesOptions::default());
        let series = source.fetch(&DataRequest::new("ETHUSD", "1d")).unwrap();

        assert_eq!(series.symbol(), "ETHUSD");
        assert_eq!(series.len(), 3);
        assert_eq!(series.rejected_bars(), 1);
    }

    #[test]
    fn csv_source_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::directory(dir.path(), SeriesOptions::default());
        assert!(matches!(
            source.fetch(&DataRequest::new("NOPE", "1d")),
            Err(AetraderError::MarketDataUnavailable(_))
        ));
    }

    #[test]
    fn in_memory_source_filters_by_range() {
        let mut source = InMemorySource::new(SeriesOptions::default());
        let candles = (1..=5)
            .map(|day| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 1.0,
            })
            .collect();
        source.insert("SOL", candles);

        let request = DataRequest::new("SOL", "1d").between(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(),
        );
        assert_eq!(source.fetch(&request).unwrap().len(), 3);
    }
}
