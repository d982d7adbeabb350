//! binsim-dsp: partitioned convolution for BinSim
//!
//! ## Modules
//! - `partition` - FFT plans, frequency-domain filter partitions, stereo filter pairs
//! - `convolution` - Uniform partitioned convolver with crossfaded filter swaps

pub mod convolution;
pub mod error;
pub mod partition;

pub use convolution::{ConvolverRole, PartitionedConvolver};
pub use error::{DspError, DspResult};
pub use partition::{FftPlan, FilterPair, FilterPartitionSet};

/// Trait for all DSP processors
pub trait Processor: Send {
    /// Reset processor state
    fn reset(&mut self);
}
