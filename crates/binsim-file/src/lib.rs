//! binsim-file: Audio File I/O
//!
//! Decodes impulse responses and sound files:
//! - WAV (via hound) - native, any bit depth
//! - FLAC, MP3, OGG Vorbis, AIFF, AAC (via symphonia)
//!
//! Also writes 32-bit float WAV files for offline renders.

mod audio_file;
mod error;
mod wav_writer;

pub use audio_file::*;
pub use error::*;
pub use wav_writer::*;
