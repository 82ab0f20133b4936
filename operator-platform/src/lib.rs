pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use config::OperatorConfig;
pub use error::{OperatorError, Result};
