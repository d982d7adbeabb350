//! Error types for BinSim configuration

use thiserror::Error;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: missing value for '{key}'")]
    MissingValue { line: usize, key: String },

    #[error("Line {line}: invalid value '{value}' for '{key}'")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

/// Result type alias
pub type ConfigResult<T> = Result<T, ConfigError>;
