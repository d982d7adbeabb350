//! Channel bank: per-channel convolution, mix, headphone EQ, gain

use binsim_core::{BinSimConfig, InputBlock, Sample, StereoBlock};
use binsim_dsp::{ConvolverRole, FftPlan, FilterPair, PartitionedConvolver, Processor};

use crate::{EngineError, EngineResult};

/// One source convolver per input channel plus an optional headphone stage
pub struct ChannelBank {
    convolvers: Vec<PartitionedConvolver>,
    headphone: Option<PartitionedConvolver>,
    /// Output of the channel being convolved
    scratch: StereoBlock,
    mix: StereoBlock,
    headphone_out: StereoBlock,
    gain: Sample,
    /// Channel count of the previous block
    last_active: usize,
}

impl ChannelBank {
    /// Build `max_channels` silent convolvers (and the headphone stage if enabled)
    pub fn new(config: &BinSimConfig, plan: &FftPlan) -> Self {
        let block_size = plan.block_size();
        let partitions = config.partition_count();
        let convolver = |role| {
            PartitionedConvolver::with_plan(role, plan.clone(), partitions, config.crossfade_blocks)
        };

        Self {
            convolvers: (0..config.max_channels)
                .map(|_| convolver(ConvolverRole::Source))
                .collect(),
            headphone: config
                .use_headphone_filter
                .then(|| convolver(ConvolverRole::Headphone)),
            scratch: StereoBlock::new(block_size),
            mix: StereoBlock::new(block_size),
            headphone_out: StereoBlock::new(block_size),
            gain: mix_gain(config.max_channels, config.loudness_factor),
            last_active: 0,
        }
    }

    /// Number of source convolvers
    #[inline]
    pub fn channels(&self) -> usize {
        self.convolvers.len()
    }

    /// Combined normalization and loudness gain
    #[inline]
    pub fn gain(&self) -> Sample {
        self.gain
    }

    /// Result of the last [`process`](Self::process)
    #[inline]
    pub fn output(&self) -> &StereoBlock {
        &self.mix
    }

    #[inline]
    pub fn has_headphone_stage(&self) -> bool {
        self.headphone.is_some()
    }

    /// Queue a filter swap for one channel
    pub fn set_filter(
        &mut self,
        channel: usize,
        filter: FilterPair,
        crossfade: bool,
    ) -> EngineResult<()> {
        let channels = self.convolvers.len();
        let convolver = self
            .convolvers
            .get_mut(channel)
            .ok_or(EngineError::ChannelOutOfRange { channel, channels })?;
        convolver.set_ir(filter, crossfade)?;
        Ok(())
    }

    /// Install the headphone filter (no crossfade)
    pub fn set_headphone_filter(&mut self, filter: FilterPair) -> EngineResult<()> {
        if let Some(headphone) = self.headphone.as_mut() {
            headphone.set_ir(filter, false)?;
        }
        Ok(())
    }

    /// Convolve and mix the first `active` channels of `input`
    ///
    /// Channels that were active in the previous block but not in this one
    /// are reset, so they start clean when they come back.
    pub fn process(&mut self, input: &InputBlock, active: usize) -> &StereoBlock {
        let active = active.min(self.convolvers.len()).min(input.channels());
        if active < self.last_active {
            log::debug!("Channels {}..{} went inactive", active, self.last_active);
            for convolver in &mut self.convolvers[active..self.last_active] {
                convolver.reset();
            }
        }
        self.last_active = active;

        self.mix.clear();
        for (channel, convolver) in self.convolvers.iter_mut().enumerate().take(active) {
            if channel == 0 {
                let (left, right) = self.mix.split_mut();
                convolver.process(input.channel(channel), left, right);
                continue;
            }

            let (left, right) = self.scratch.split_mut();
            convolver.process(input.channel(channel), left, right);
            let (mix_left, mix_right) = self.mix.split_mut();
            for (m, s) in mix_left.iter_mut().zip(self.scratch.left()) {
                *m += s;
            }
            for (m, s) in mix_right.iter_mut().zip(self.scratch.right()) {
                *m += s;
            }
        }

        if let Some(headphone) = self.headphone.as_mut() {
            let (out_left, out_right) = self.headphone_out.split_mut();
            headphone.process_stereo(self.mix.left(), self.mix.right(), out_left, out_right);
            std::mem::swap(&mut self.mix, &mut self.headphone_out);
        }

        self.mix.scale(self.gain);
        &self.mix
    }

    /// Output a silent block without running any convolver
    pub fn silence(&mut self) -> &StereoBlock {
        self.mix.clear();
        &self.mix
    }

    /// Clear every convolver's history and tails
    pub fn reset(&mut self) {
        for convolver in &mut self.convolvers {
            convolver.reset();
        }
        if let Some(headphone) = self.headphone.as_mut() {
            headphone.reset();
        }
        self.mix.clear();
        self.last_active = 0;
    }
}

/// `loudness / ((max_channels + 1) * 2)`
pub fn mix_gain(max_channels: usize, loudness_factor: f64) -> Sample {
    loudness_factor / ((max_channels + 1) * 2) as f64
}
