mod csv;
mod types;
mod validator;

pub use csv::CsvConnector;
pub use types::{DataRequest, RequiredColumn};
pub use validator::DataValidator;
