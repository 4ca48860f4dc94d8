pub mod cache;
pub mod connectors;
pub mod series;
pub mod source;

pub use cache::CachedSource;
pub use connectors::{CsvConnector, DataRequest};
pub use series::{PriceSeries, SeriesOptions};
pub use source::{CsvSource, InMemorySource, MarketDataSource};
