use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::TransportError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
