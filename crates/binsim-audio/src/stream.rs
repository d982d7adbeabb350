//! Device output through cpal

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, Device, SampleFormat, Stream, StreamConfig};

use crate::renderer::{BlockAdapter, BlockRenderer};
use crate::{AudioConfig, AudioError, AudioResult};

/// Stream state shared with the audio callback
struct StreamState {
    running: AtomicBool,
    finished: AtomicBool,
}

/// Output stream driving a [`BlockRenderer`]
///
/// The stream is paused when dropped.
pub struct OutputStream {
    stream: Stream,
    state: Arc<StreamState>,
    config: AudioConfig,
    device_name: String,
}

impl OutputStream {
    /// Open the configured (or default) output device
    pub fn open<R>(renderer: R, config: AudioConfig) -> AudioResult<Self>
    where
        R: BlockRenderer + 'static,
    {
        let device = match config.device.as_deref() {
            Some(name) => crate::get_output_device_by_name(name)?,
            None => crate::get_default_output_device()?,
        };
        Self::with_device(&device, renderer, config)
    }

    pub fn with_device<R>(device: &Device, renderer: R, config: AudioConfig) -> AudioResult<Self>
    where
        R: BlockRenderer + 'static,
    {
        let state = Arc::new(StreamState {
            running: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });

        let stream_config = get_output_stream_config(device, &config)?;
        let stream = build_output_stream(device, &stream_config, renderer, Arc::clone(&state))?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        log::info!(
            "Opened output '{}' ({} channels @ {} Hz)",
            device_name,
            stream_config.channels,
            stream_config.sample_rate.0
        );

        Ok(Self {
            stream,
            state,
            config,
            device_name,
        })
    }

    /// Start the audio stream
    pub fn start(&self) -> AudioResult<()> {
        self.stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        self.state.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop the audio stream
    pub fn stop(&self) -> AudioResult<()> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        self.state.running.store(false, Ordering::Release);
        Ok(())
    }

    /// Check if stream is running
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// True once the renderer completed and its last block was played
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.is_running()
            && let Err(e) = self.stop()
        {
            log::warn!("Failed to stop output stream: {}", e);
        }
    }
}

fn get_output_stream_config(device: &Device, config: &AudioConfig) -> AudioResult<StreamConfig> {
    let sample_rate = cpal::SampleRate(config.sample_rate);

    let configs = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    let mut rate_supported = false;
    for supported in configs {
        if supported.min_sample_rate() <= sample_rate && supported.max_sample_rate() >= sample_rate
        {
            rate_supported = true;
            if supported.sample_format() == SampleFormat::F32 {
                let buffer_size = match config.buffer_frames {
                    Some(frames) => CpalBufferSize::Fixed(frames),
                    None => CpalBufferSize::Default,
                };
                return Ok(StreamConfig {
                    channels: supported.channels(),
                    sample_rate,
                    buffer_size,
                });
            }
        }
    }

    if !rate_supported {
        return Err(AudioError::UnsupportedSampleRate(config.sample_rate));
    }
    Err(AudioError::ConfigError(format!(
        "No f32 output config @ {}Hz",
        config.sample_rate
    )))
}

fn build_output_stream<R>(
    device: &Device,
    config: &StreamConfig,
    renderer: R,
    state: Arc<StreamState>,
) -> AudioResult<Stream>
where
    R: BlockRenderer + 'static,
{
    let channels = config.channels as usize;
    let mut adapter = BlockAdapter::new(renderer);

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                adapter.fill(data, channels);
                if adapter.is_finished() {
                    state.finished.store(true, Ordering::Release);
                }
            },
            move |err| {
                // Underruns surface here
                log::error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
