//! Errors for AIS watch
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AisWatchError {
    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("HTTP client error")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),
}

/// Failure to obtain a fleet snapshot. The only error shown to the user.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Store is not available")]
    Unavailable,

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Corrupt stored value")]
    CorruptValue(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Sink responded with HTTP {0}")]
    HttpStatus(u16),
}
