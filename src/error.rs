use thiserror::Error;

#[derive(Error, Debug)]
pub enum AetraderError {
    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Malformed market data: {0}")]
    MalformedMarketData(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("Evaluation of genome {genome} exceeded {limit_ms} ms")]
    EvaluationTimeout { genome: String, limit_ms: u128 },

    #[error("Backtest error: {0}")]
    Backtest(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AetraderError>;
