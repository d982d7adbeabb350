//! File I/O error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Decode error in {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("WAV error in {path}: {message}")]
    Wav { path: PathBuf, message: String },
}

pub type FileResult<T> = Result<T, FileError>;
