use thiserror::Error;

use yaraguard_common::Table;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error on {table}: {message}")]
    Store { table: Table, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscription error on {table}: {message}")]
    Subscription { table: Table, message: String },
}

impl OperatorError {
    pub fn store(table: Table, message: impl Into<String>) -> Self {
        OperatorError::Store {
            table,
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for OperatorError {
    fn from(error: config::ConfigError) -> Self {
        OperatorError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
