//! Engine error types

use binsim_core::ConfigError;
use binsim_dsp::DspError;
use binsim_file::FileError;
use binsim_filter::FilterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Sound file error: {0}")]
    File(#[from] FileError),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("Channel {channel} out of range (0..{channels})")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Filters use {filters} sample blocks, session uses {session}")]
    BlockSizeMismatch { filters: usize, session: usize },

    #[error("Headphone filter enabled but the filter list has no HPFILTER entry")]
    MissingHeadphoneFilter,

    #[error("Sound source is busy, playlist dropped")]
    SourceBusy,

    #[error("Empty playlist")]
    EmptyPlaylist,
}

pub type EngineResult<T> = Result<T, EngineError>;
