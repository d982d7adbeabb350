//! WAV writing (hound)

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::{AudioData, FileError, FileResult};

/// Incremental writer for 32-bit float WAV files
///
/// Used by the offline renderer, which produces interleaved blocks.
pub struct WavStreamWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    channels: u16,
    frames: u64,
}

impl WavStreamWriter {
    pub fn create<P: AsRef<Path>>(path: P, channels: u16, sample_rate: u32) -> FileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(&path, spec).map_err(|e| FileError::Wav {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            writer,
            path,
            channels,
            frames: 0,
        })
    }

    /// Append interleaved samples
    pub fn write_interleaved(&mut self, samples: &[f32]) -> FileResult<()> {
        for &sample in samples {
            self.writer.write_sample(sample).map_err(|e| FileError::Wav {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        }
        self.frames += (samples.len() / self.channels.max(1) as usize) as u64;
        Ok(())
    }

    /// Frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush the header and close the file
    pub fn finalize(self) -> FileResult<u64> {
        let Self {
            writer,
            path,
            frames,
            ..
        } = self;
        writer.finalize().map_err(|e| FileError::Wav {
            path,
            message: e.to_string(),
        })?;
        Ok(frames)
    }
}

/// Write audio data as a 32-bit float WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, data: &AudioData) -> FileResult<()> {
    let mut writer = WavStreamWriter::create(path, data.num_channels() as u16, data.sample_rate)?;

    let frames = data.num_frames();
    let mut frame = vec![0.0_f32; data.num_channels()];
    for i in 0..frames {
        for (out, channel) in frame.iter_mut().zip(&data.channels) {
            *out = channel[i] as f32;
        }
        writer.write_interleaved(&frame)?;
    }

    writer.finalize()?;
    Ok(())
}
