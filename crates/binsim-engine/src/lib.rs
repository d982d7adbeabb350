//! binsim-engine: Real-time binaural render engine
//!
//! Ties the filter repository and the convolvers to a sound source:
//! - Filter selection table (control thread writes, render thread polls)
//! - Channel bank (per-channel convolution, mix, headphone EQ, gain)
//! - Render loop (one block per call, lock-free)
//! - Sound-file source with lock-free playlist swaps
//! - Session setup from a [`BinSimConfig`](binsim_core::BinSimConfig)

// Audio engine uses explicit indexing in the block loops
#![allow(clippy::needless_range_loop)]

mod channel_bank;
mod error;
mod render;
mod selection;
mod session;
mod source;

pub use channel_bank::{ChannelBank, mix_gain};
pub use error::{EngineError, EngineResult};
pub use render::{RenderLoop, StopHandle};
pub use selection::FilterSelectionTable;
pub use session::BinSim;
pub use source::{Playlist, SoundFilePlayer, SoundLoader, SoundSource};
