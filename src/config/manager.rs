use super::{
    backtesting::BacktestingConfig, data::DataConfig, evolution::EvolutionConfig,
    fitness::FitnessConfig, risk::RiskLimits, traits::ConfigSection,
};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "AETRADER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub risk: RiskLimits,
    pub backtesting: BacktestingConfig,
    pub fitness: FitnessConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AetraderError> {
        self.evolution.validate()?;
        self.risk.validate()?;
        self.backtesting.validate()?;
        self.fitness.validate()?;
        self.data.validate()?;
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AetraderError> {
        let config: AppConfig = toml::from_str(contents).map_err(|e| {
            AetraderError::ConfigurationInvalid(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AetraderError> {
        let toml_str = toml::to_string_pretty(self).map_err(|e| {
            AetraderError::ConfigurationInvalid(format!("Failed to serialize: {}", e))
        })?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

/// Loads the configuration once at startup: defaults, then an optional file,
/// then `AETRADER__SECTION__FIELD` environment overrides. The result is
/// validated before it is handed out and never changes afterwards.
#[derive(Debug, Default)]
pub struct ConfigManager {
    file: Option<PathBuf>,
    use_env: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn load(&self) -> Result<AppConfig, AetraderError> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(AetraderError::ConfigurationInvalid(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        if self.use_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AetraderError::ConfigurationInvalid(e.to_string()))?;

        config.validate()?;
        log::info!(
            "Configuration loaded (population {}, max generations {})",
            config.evolution.population_size,
            config.evolution.max_generations
        );
        Ok(config)
    }
}
