use crate::error::AetraderError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), AetraderError>;
}

/// Shorthand for a `ConfigurationInvalid` error tagged with its section.
pub(crate) fn invalid<S: ConfigSection>(message: impl Into<String>) -> AetraderError {
    AetraderError::ConfigurationInvalid(format!("[{}] {}", S::section_name(), message.into()))
}
