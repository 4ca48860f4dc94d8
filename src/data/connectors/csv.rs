use crate::error::{AetraderError, Result};
use crate::types::Candle;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use polars::prelude::*;
use std::path::Path;
use super::{types::RequiredColumn, validator::DataValidator};
use std::collections::HashMap;

/// Integer timestamps above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| AetraderError::MarketDataUnavailable(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load and validate CSV file
    pub fn load_and_validate<P: AsRef<Path>>(
        path: P,
        min_rows: Option<usize>,
    ) -> Result<(DataFrame, HashMap<RequiredColumn, String>)> {
        let df = Self::load(&path)?;

        let column_map = DataValidator::validate_ohlcv(&df)?;

        let min_rows = min_rows.unwrap_or(2);
        DataValidator::validate_minimum_rows(&df, min_rows)?;

        // Rows with nulls are dropped during conversion
        let null_report = DataValidator::check_nulls(&df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }

        Ok((df, column_map))
    }

    /// Convert validated rows into candles. Rows with a null or unparseable field are
    /// skipped; OHLC consistency is checked later by `PriceSeries`.
    pub fn to_candles(
        df: &DataFrame,
        column_map: &HashMap<RequiredColumn, String>,
    ) -> Result<Vec<Candle>> {
        let timestamps = Self::parse_timestamps(df, mapped_column(column_map, RequiredColumn::Timestamp)?)?;
        let open = df.column(mapped_column(column_map, RequiredColumn::Open)?)?.cast(&DataType::Float64)?;
        let high = df.column(mapped_column(column_map, RequiredColumn::High)?)?.cast(&DataType::Float64)?;
        let low = df.column(mapped_column(column_map, RequiredColumn::Low)?)?.cast(&DataType::Float64)?;
        let close = df.column(mapped_column(column_map, RequiredColumn::Close)?)?.cast(&DataType::Float64)?;
        let volume = df.column(mapped_column(column_map, RequiredColumn::Volume)?)?.cast(&DataType::Float64)?;

        let open = open.f64()?;
        let high = high.f64()?;
        let low = low.f64()?;
        let close = close.f64()?;
        let volume = volume.f64()?;

        let mut candles = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        for (i, timestamp) in timestamps.into_iter().enumerate() {
            match (timestamp, open.get(i), high.get(i), low.get(i), close.get(i), volume.get(i)) {
                (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                    candles.push(Candle { timestamp, open, high, low, close, volume });
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("Skipped {} incomplete rows", skipped);
        }

        Ok(candles)
    }

    fn parse_timestamps(df: &DataFrame, name: &str) -> Result<Vec<Option<DateTime<Utc>>>> {
        let series = df.column(name)?;
        match series.dtype() {
            DataType::String => {
                let values = series.str()?;
                Ok((0..df.height())
                    .map(|i| values.get(i).and_then(parse_timestamp_str))
                    .collect())
            }
            DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => {
                let cast = series.cast(&DataType::Int64)?;
                let values = cast.i64()?;
                Ok((0..df.height())
                    .map(|i| values.get(i).and_then(epoch_to_datetime))
                    .collect())
            }
            other => Err(AetraderError::MalformedMarketData(format!(
                "Timestamp column '{}' has unsupported type {:?}",
                name, other
            ))),
        }
    }
}

fn mapped_column(
    column_map: &HashMap<RequiredColumn, String>,
    required: RequiredColumn,
) -> Result<&str> {
    column_map
        .get(&required)
        .map(|s| s.as_str())
        .ok_or_else(|| {
            AetraderError::MalformedMarketData(format!("Unmapped column {}", required.as_str()))
        })
}

fn epoch_to_datetime(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

fn parse_timestamp_str(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    value.parse::<i64>().ok().and_then(epoch_to_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_to_candles_with_epoch_seconds() {
        let df = df! {
            "timestamp" => &[1_700_000_000i64, 1_700_003_600],
            "open" => &[100.0, 101.0],
            "high" => &[101.0, 103.0],
            "low" => &[99.0, 100.0],
            "close" => &[100.5, 102.0],
            "volume" => &[1000i64, 1500],
        }
        .unwrap();

        let map = DataValidator::validate_ohlcv(&df).unwrap();
        let candles = CsvConnector::to_candles(&df, &map).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].timestamp.timestamp(), 1_700_003_600);
        assert_eq!(candles[1].volume, 1500.0);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp_str("2024-03-01"), Some(expected));
        assert_eq!(parse_timestamp_str("2024-03-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp_str("2024-03-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp_str("1709251200000"), Some(expected));
        assert_eq!(parse_timestamp_str("not a date"), None);
    }
}
