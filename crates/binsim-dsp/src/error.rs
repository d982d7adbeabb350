//! Error types for binsim-dsp

use thiserror::Error;

/// DSP error
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Filter has {len} samples, more than the filter size {max}")]
    FilterTooLong { len: usize, max: usize },

    #[error("Block size mismatch: expected {expected}, got {got}")]
    BlockSizeMismatch { expected: usize, got: usize },

    #[error("FFT error: {0}")]
    Fft(String),
}

/// Result type alias
pub type DspResult<T> = Result<T, DspError>;
