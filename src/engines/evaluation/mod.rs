pub mod backtester;
pub mod indicators;
pub mod portfolio;
pub mod strategy;

pub use backtester::{BacktestReport, Backtester};
pub use indicators::{IndicatorRow, Indicators};
pub use portfolio::Portfolio;
pub use strategy::{default_gene_spec, Combinator, RuleStrategy, Strategy};
