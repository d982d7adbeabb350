//! binsim-audio: audio hosts for BinSim
//!
//! Hosts drive a [`BlockRenderer`] and deliver its fixed-size stereo blocks:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ RenderLoop   │────▶│ OutputStream │────▶│ cpal Device │
//! │ (renderer)   │     │ BlockAdapter │     │             │
//! └──────────────┘     └──────────────┘     └─────────────┘
//!        │
//!        └────────────▶ render_to_wav (offline, hound)
//! ```

mod device;
mod error;
mod offline;
mod renderer;
mod stream;

pub use device::*;
pub use error::*;
pub use offline::*;
pub use renderer::*;
pub use stream::*;

/// Output stream configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Fixed device period in frames, `None` for the backend default
    pub buffer_frames: Option<u32>,
    /// Output device name, `None` for the default device
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_frames: None,
            device: None,
        }
    }
}
