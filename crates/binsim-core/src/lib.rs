//! binsim-core: Shared types, configuration and errors for BinSim
//!
//! This crate provides the foundational types used across all BinSim crates:
//! the sample type, block buffers, the filter key that identifies an impulse
//! response in the catalog, and the immutable session configuration.

mod config;
mod error;
mod key;
mod sample;

pub use config::*;
pub use error::*;
pub use key::*;
pub use sample::*;

/// Number of output channels of a binaural render (left ear, right ear)
pub const OUTPUT_CHANNELS: usize = 2;

/// Number of partitions needed to cover `filter_size` samples with
/// `block_size` sized segments
#[inline]
pub fn partition_count(filter_size: usize, block_size: usize) -> usize {
    filter_size.div_ceil(block_size)
}
