use crate::error::{AetraderError, Result};
use polars::prelude::*;
use super::types::RequiredColumn;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Validate that the DataFrame has a timestamp column and numeric OHLCV columns.
    /// Row-level OHLC checks happen when candles are built, so that a bad bar is
    /// dropped on its own instead of failing the whole file.
    pub fn validate_ohlcv(df: &DataFrame) -> Result<HashMap<RequiredColumn, String>> {
        let mut column_map = HashMap::new();

        for required in RequiredColumn::all() {
            match Self::find_column(df, &required) {
                Some(col_name) => {
                    column_map.insert(required, col_name.to_string());
                }
                None => {
                    return Err(AetraderError::MalformedMarketData(format!(
                        "Missing required column: {} (tried aliases: {:?})",
                        required.as_str(),
                        required.aliases()
                    )));
                }
            }
        }

        for (req_col, actual_name) in &column_map {
            if !req_col.is_price() {
                continue;
            }
            let series = df.column(actual_name)?;
            if !matches!(series.dtype(), DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32) {
                return Err(AetraderError::MalformedMarketData(format!(
                    "Column '{}' ({}) must be numeric, found {:?}",
                    actual_name,
                    req_col.as_str(),
                    series.dtype()
                )));
            }
        }

        Ok(column_map)
    }

    /// Find column by checking aliases
    fn find_column<'a>(df: &'a DataFrame, required: &RequiredColumn) -> Option<&'a str> {
        let columns = df.get_column_names();
        for alias in required.aliases() {
            if columns.iter().any(|col| col.as_str() == alias) {
                return Some(alias);
            }
        }
        None
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(AetraderError::MalformedMarketData(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Check for null values in critical columns
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_validate_good_data() {
        let df = df! {
            "timestamp" => &[1_700_000_000i64, 1_700_003_600, 1_700_007_200],
            "open" => &[100.0, 101.0, 102.0],
            "high" => &[101.0, 103.0, 104.0],
            "low" => &[99.0, 100.0, 101.0],
            "close" => &[100.5, 102.0, 103.0],
            "volume" => &[1000.0, 1500.0, 1200.0],
        }
        .unwrap();

        assert!(DataValidator::validate_ohlcv(&df).is_ok());
    }

    #[test]
    fn test_validate_missing_column() {
        let df = df! {
            "timestamp" => &[1i64, 2],
            "open" => &[100.0, 101.0],
            "high" => &[101.0, 103.0],
            "low" => &[99.0, 100.0],
            // Missing 'close'
            "volume" => &[1000.0, 1500.0],
        }
        .unwrap();

        assert!(DataValidator::validate_ohlcv(&df).is_err());
    }

    #[test]
    fn test_validate_non_numeric_price() {
        let df = df! {
            "timestamp" => &[1i64, 2],
            "open" => &["a", "b"],
            "high" => &[101.0, 103.0],
            "low" => &[99.0, 100.0],
            "close" => &[100.5, 102.0],
            "volume" => &[1000.0, 1500.0],
        }
        .unwrap();

        assert!(matches!(
            DataValidator::validate_ohlcv(&df),
            Err(AetraderError::MalformedMarketData(_))
        ));
    }

    #[test]
    fn test_column_aliases() {
        let df = df! {
            "Date" => &["2024-01-01", "2024-01-02"],
            "Open" => &[100.0, 101.0],
            "HIGH" => &[101.0, 103.0],
            "low" => &[99.0, 100.0],
            "Close" => &[100.5, 102.0],
            "Vol" => &[1000.0, 1500.0],
        }
        .unwrap();

        let map = DataValidator::validate_ohlcv(&df).unwrap();
        assert_eq!(map[&RequiredColumn::Timestamp], "Date");
        assert_eq!(map[&RequiredColumn::Volume], "Vol");
    }
}
