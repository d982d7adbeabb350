//! Real-time render loop
//!
//! One call renders one block:
//!
//! ```text
//! stop? ─▶ source swaps ─▶ poll selection ─▶ set_ir ─▶ read source
//!                                                          │
//!        interleaved f32 ◀── gain ◀── headphone EQ ◀── ChannelBank
//! ```
//!
//! Nothing in here allocates, locks or blocks once constructed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use binsim_audio::{BlockRenderer, RenderStatus};
use binsim_core::{BinSimConfig, InputBlock, OUTPUT_CHANNELS, StereoBlock};
use binsim_filter::FilterRepository;

use crate::channel_bank::ChannelBank;
use crate::selection::FilterSelectionTable;
use crate::source::SoundSource;
use crate::{EngineError, EngineResult};

// ═══════════════════════════════════════════════════════════════════════════
// STOP HANDLE
// ═══════════════════════════════════════════════════════════════════════════

/// Cooperative stop flag, checked once per block
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RENDER LOOP
// ═══════════════════════════════════════════════════════════════════════════

/// Drives the channel bank from a sound source and the selection table
pub struct RenderLoop<S> {
    repository: Arc<FilterRepository>,
    selection: Arc<FilterSelectionTable>,
    source: S,
    bank: ChannelBank,
    input: InputBlock,
    /// Last selection generation consumed per channel
    seen: Vec<u64>,
    stop: StopHandle,
    block_size: usize,
    crossfade: bool,
    complete: bool,
}

impl<S: SoundSource> RenderLoop<S> {
    /// Build the loop and install the headphone filter
    ///
    /// Fails when the repository was partitioned for another block size, or
    /// when headphone equalization is enabled without a headphone filter.
    pub fn new(
        config: &BinSimConfig,
        repository: Arc<FilterRepository>,
        selection: Arc<FilterSelectionTable>,
        source: S,
        stop: StopHandle,
    ) -> EngineResult<Self> {
        if repository.block_size() != config.block_size {
            return Err(EngineError::BlockSizeMismatch {
                filters: repository.block_size(),
                session: config.block_size,
            });
        }

        let mut bank = ChannelBank::new(config, repository.plan());
        if config.use_headphone_filter {
            let headphone = repository
                .headphone_filter()
                .ok_or(EngineError::MissingHeadphoneFilter)?;
            bank.set_headphone_filter(headphone.clone())?;
        }

        Ok(Self {
            input: InputBlock::new(config.max_channels, config.block_size),
            seen: vec![0; config.max_channels],
            block_size: config.block_size,
            crossfade: config.enable_crossfading,
            complete: false,
            repository,
            selection,
            source,
            bank,
            stop,
        })
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[inline]
    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Stereo result of the last block, before conversion to `f32`
    #[inline]
    pub fn output(&self) -> &StereoBlock {
        self.bank.output()
    }

    /// Render one block into [`output`](Self::output)
    pub fn process_block(&mut self) -> RenderStatus {
        if self.complete || self.stop.is_stop_requested() {
            if !self.complete {
                log::info!("Stop requested, ending render");
            }
            self.complete = true;
            self.bank.silence();
            return RenderStatus::Complete;
        }

        self.source.poll_swaps();
        let active = self.source.channels().min(self.bank.channels());

        self.apply_selection(active);

        let frames = self.source.read_block(&mut self.input);
        let status = if frames < self.block_size {
            self.input.clear_from(frames);
            self.complete = true;
            log::info!("Sound source ended");
            RenderStatus::Complete
        } else {
            RenderStatus::Continue
        };

        self.bank.process(&self.input, active);
        status
    }

    fn apply_selection(&mut self, active: usize) {
        let repository = &self.repository;
        let bank = &mut self.bank;
        let crossfade = self.crossfade;

        for (channel, seen) in self.seen.iter_mut().enumerate().take(active) {
            self.selection.poll(channel, seen, |key| match repository.get(key) {
                Some(filter) => {
                    if let Err(e) = bank.set_filter(channel, filter.clone(), crossfade) {
                        log::error!("Channel {}: cannot set filter {}: {}", channel, key, e);
                    }
                }
                None => log::warn!("Channel {}: filter not found: {}", channel, key),
            });
        }
    }
}

impl<S: SoundSource> BlockRenderer for RenderLoop<S> {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn render(&mut self, output: &mut [f32]) -> RenderStatus {
        let status = self.process_block();
        let samples = (self.block_size * OUTPUT_CHANNELS).min(output.len());
        self.bank.output().write_interleaved(&mut output[..samples]);
        status
    }
}
