//! Error types for the filter repository

use std::path::PathBuf;

use binsim_core::FilterKey;
use binsim_dsp::DspError;
use binsim_file::FileError;
use thiserror::Error;

/// Filter repository error types
#[derive(Error, Debug)]
pub enum FilterError {
    /// Filter list could not be read
    #[error("Cannot read filter list {path}: {source}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filter list line is not `key... path`
    #[error("Filter list line {line}: {reason}")]
    CatalogLine { line: usize, reason: String },

    /// Same key listed twice
    #[error("Filter list line {line}: duplicate key '{key}'")]
    DuplicateKey { line: usize, key: FilterKey },

    /// Referenced filter file could not be decoded
    #[error("Cannot load filter {path}: {source}")]
    FilterFile {
        path: PathBuf,
        #[source]
        source: FileError,
    },

    /// Filter file is not stereo
    #[error("Filter {path} has {channels} channels, expected 2")]
    ChannelCount { path: PathBuf, channels: usize },

    /// Filter longer than the configured filter size
    #[error("Filter {path} has {frames} samples, more than the filter size {filter_size}")]
    Malformed {
        path: PathBuf,
        frames: usize,
        filter_size: usize,
    },

    /// No filter stored under the key
    #[error("No filter for key '{0}'")]
    NotFound(FilterKey),

    /// Partitioning failed
    #[error(transparent)]
    Dsp(#[from] DspError),
}

impl FilterError {
    /// True for the errors that abort loading
    pub fn is_load_error(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
