pub mod traits;
pub mod evolution;
pub mod backtesting;
pub mod risk;
pub mod fitness;
pub mod data;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use evolution::{DiversityConfig, EvolutionConfig};
pub use backtesting::BacktestingConfig;
pub use risk::RiskLimits;
pub use fitness::FitnessConfig;
pub use data::{DataConfig, GapPolicy};
pub use traits::ConfigSection;
