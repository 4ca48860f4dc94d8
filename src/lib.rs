pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod execution;
pub mod persistence;
pub mod types;

pub use error::{AetraderError, Result};
