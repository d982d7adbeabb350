//! Uniform partitioned convolution with filter crossfading
//!
//! Every input block is transformed once and pushed into a frequency-domain
//! delay line. The output of a block is the inverse transform of
//! `sum_k X[n-k] * H[k]`, whose first half is added to the tail saved from the
//! previous block.
//!
//! Filter swaps happen at block boundaries. The incoming filter gets its own
//! tail, primed from the delay line before the new block is pushed, so its
//! output is exact from the first block it contributes to. With crossfading
//! enabled both filters run for `crossfade_blocks` blocks and their outputs
//! are blended linearly.
//!
//! After construction `process` performs no allocation unless a swap changes
//! the partition count.

use rustfft::num_complex::Complex;

use binsim_core::Sample;

use crate::partition::{FftPlan, FilterPair, FilterPartitionSet};
use crate::{DspError, DspResult, Processor};

// ============ Role ============

/// How the convolver's inputs map to the two ears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvolverRole {
    /// One input convolved with the left and right filter
    #[default]
    Source,
    /// Two inputs, each ear convolved with its own input
    Headphone,
}

impl ConvolverRole {
    #[inline]
    fn input_count(self) -> usize {
        match self {
            Self::Source => 1,
            Self::Headphone => 2,
        }
    }

    /// Delay line feeding the given ear
    #[inline]
    fn input_for_ear(self, ear: usize) -> usize {
        match self {
            Self::Source => 0,
            Self::Headphone => ear,
        }
    }
}

// ============ Delay Line ============

/// Ring of input spectra, newest at `head`
#[derive(Debug)]
struct DelayLine {
    slots: Vec<Vec<Complex<f64>>>,
    head: usize,
}

impl DelayLine {
    fn new(depth: usize, bins: usize) -> Self {
        let depth = depth.max(1);
        Self {
            slots: vec![vec![Complex::new(0.0, 0.0); bins]; depth],
            head: 0,
        }
    }

    #[inline]
    fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Spectrum pushed `age` blocks ago
    #[inline]
    fn get(&self, age: usize) -> &[Complex<f64>] {
        let depth = self.depth();
        &self.slots[(self.head + depth - age % depth) % depth]
    }

    /// Advance and return the slot for the next spectrum
    #[inline]
    fn advance(&mut self) -> &mut [Complex<f64>] {
        self.head = (self.head + 1) % self.depth();
        &mut self.slots[self.head]
    }

    /// Change depth, keeping the most recent spectra
    fn resize(&mut self, depth: usize) {
        let depth = depth.max(1);
        if depth == self.depth() {
            return;
        }

        let bins = self.slots[0].len();
        let keep = depth.min(self.depth());
        let mut slots = Vec::with_capacity(depth);
        slots.resize_with(depth - keep, || vec![Complex::new(0.0, 0.0); bins]);
        for age in (0..keep).rev() {
            slots.push(self.get(age).to_vec());
        }

        self.slots = slots;
        self.head = depth - 1;
    }

    fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.fill(Complex::new(0.0, 0.0));
        }
    }
}

// ============ Spectral Kernel ============

/// FFT plans plus every scratch buffer the real-time path needs
struct SpectralKernel {
    plan: FftPlan,
    time_in: Vec<f64>,
    accum: Vec<Complex<f64>>,
    time_out: Vec<f64>,
    forward_scratch: Vec<Complex<f64>>,
    inverse_scratch: Vec<Complex<f64>>,
    norm: f64,
}

impl SpectralKernel {
    fn new(plan: FftPlan) -> Self {
        Self {
            time_in: plan.forward().make_input_vec(),
            accum: plan.inverse().make_input_vec(),
            time_out: plan.inverse().make_output_vec(),
            forward_scratch: plan.forward().make_scratch_vec(),
            inverse_scratch: plan.inverse().make_scratch_vec(),
            norm: 1.0 / plan.fft_size() as f64,
            plan,
        }
    }

    #[inline]
    fn block_size(&self) -> usize {
        self.plan.block_size()
    }

    /// Transform one input block into the next delay-line slot
    fn push_input(&mut self, input: &[Sample], line: &mut DelayLine) {
        let n = input.len().min(self.block_size());
        self.time_in.fill(0.0);
        self.time_in[..n].copy_from_slice(&input[..n]);

        let slot = line.advance();
        let result = self
            .plan
            .forward()
            .process_with_scratch(&mut self.time_in, slot, &mut self.forward_scratch);
        debug_assert!(result.is_ok(), "forward FFT buffer lengths");
    }

    /// Multiply-accumulate the delay line against a filter and inverse-transform
    fn accumulate(&mut self, line: &DelayLine, filter: &FilterPartitionSet) {
        self.accum.fill(Complex::new(0.0, 0.0));

        let count = filter.partition_count().min(line.depth());
        for (age, h) in filter.partitions().iter().take(count).enumerate() {
            let x = line.get(age);
            for (acc, (a, b)) in self.accum.iter_mut().zip(x.iter().zip(h)) {
                *acc += a * b;
            }
        }

        // DC and Nyquist bins of a real signal have no imaginary part
        let last = self.accum.len() - 1;
        self.accum[0].im = 0.0;
        self.accum[last].im = 0.0;

        let result = self.plan.inverse().process_with_scratch(
            &mut self.accum,
            &mut self.time_out,
            &mut self.inverse_scratch,
        );
        debug_assert!(result.is_ok(), "inverse FFT buffer lengths");
    }

    /// Produce one output block and keep the new tail
    fn convolve(
        &mut self,
        line: &DelayLine,
        filter: &FilterPartitionSet,
        tail: &mut [Sample],
        output: &mut [Sample],
    ) {
        self.accumulate(line, filter);

        let block_size = self.block_size();
        for i in 0..block_size {
            output[i] = self.time_out[i] * self.norm + tail[i];
            tail[i] = self.time_out[block_size + i] * self.norm;
        }
    }

    /// Compute the tail `filter` would have left after the newest block
    fn prime(&mut self, line: &DelayLine, filter: &FilterPartitionSet, tail: &mut [Sample]) {
        self.accumulate(line, filter);

        let block_size = self.block_size();
        for (i, t) in tail.iter_mut().enumerate().take(block_size) {
            *t = self.time_out[block_size + i] * self.norm;
        }
    }
}

// ============ Filter State ============

/// A filter and the overlap tail it owns for each ear
struct FilterState {
    filter: FilterPair,
    tails: [Vec<Sample>; 2],
}

impl FilterState {
    fn new(filter: FilterPair, block_size: usize) -> Self {
        Self {
            filter,
            tails: [vec![0.0; block_size], vec![0.0; block_size]],
        }
    }
}

// ============ Partitioned Convolver ============

/// Block-based binaural convolver for one source or the headphone stage
pub struct PartitionedConvolver {
    role: ConvolverRole,
    kernel: SpectralKernel,
    histories: Vec<DelayLine>,
    active: FilterState,
    /// Incoming filter while a crossfade runs, otherwise the outgoing one
    ///
    /// Swaps prime its tails in place and exchange it with `active`.
    incoming: FilterState,
    crossfading: bool,
    /// Latest request that arrived during a crossfade
    queued: Option<(FilterPair, bool)>,
    fade_position: usize,
    fade_length: usize,
    /// Incoming filter output during a crossfade
    fade_buffers: [Vec<Sample>; 2],
}

impl PartitionedConvolver {
    /// Create a convolver holding a silent filter
    ///
    /// `crossfade_blocks` sets the length of crossfaded swaps.
    pub fn new(
        role: ConvolverRole,
        block_size: usize,
        partition_count: usize,
        crossfade_blocks: usize,
    ) -> Self {
        let plan = FftPlan::new(block_size);
        Self::with_plan(role, plan, partition_count, crossfade_blocks)
    }

    /// Create a convolver sharing an existing FFT plan
    pub fn with_plan(
        role: ConvolverRole,
        plan: FftPlan,
        partition_count: usize,
        crossfade_blocks: usize,
    ) -> Self {
        let block_size = plan.block_size();
        let bins = plan.bins();
        let partition_count = partition_count.max(1);
        let silent = FilterPair::silent(block_size, partition_count);

        Self {
            role,
            histories: (0..role.input_count())
                .map(|_| DelayLine::new(partition_count, bins))
                .collect(),
            active: FilterState::new(silent.clone(), block_size),
            incoming: FilterState::new(silent, block_size),
            crossfading: false,
            queued: None,
            fade_position: 0,
            fade_length: crossfade_blocks.max(1) * block_size,
            fade_buffers: [vec![0.0; block_size], vec![0.0; block_size]],
            kernel: SpectralKernel::new(plan),
        }
    }

    #[inline]
    pub fn role(&self) -> ConvolverRole {
        self.role
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.kernel.block_size()
    }

    /// Filter currently producing output (the outgoing one during a fade)
    #[inline]
    pub fn active_filter(&self) -> &FilterPair {
        &self.active.filter
    }

    /// True while two filters are being blended
    #[inline]
    pub fn is_crossfading(&self) -> bool {
        self.crossfading
    }

    /// Request a filter swap at the next block boundary
    ///
    /// A request made during a crossfade waits for it to finish; only the
    /// most recent waiting request is kept.
    pub fn set_ir(&mut self, filter: FilterPair, crossfade: bool) -> DspResult<()> {
        if filter.block_size() != self.block_size() {
            return Err(DspError::BlockSizeMismatch {
                expected: self.block_size(),
                got: filter.block_size(),
            });
        }
        self.queued = Some((filter, crossfade));
        Ok(())
    }

    /// Convolve one mono block into both ears
    pub fn process(&mut self, input: &[Sample], left_out: &mut [Sample], right_out: &mut [Sample]) {
        debug_assert_eq!(self.role, ConvolverRole::Source);
        self.run(&[input], left_out, right_out);
    }

    /// Convolve a stereo block, each ear with its own input
    pub fn process_stereo(
        &mut self,
        left_in: &[Sample],
        right_in: &[Sample],
        left_out: &mut [Sample],
        right_out: &mut [Sample],
    ) {
        debug_assert_eq!(self.role, ConvolverRole::Headphone);
        self.run(&[left_in, right_in], left_out, right_out);
    }

    fn run(&mut self, inputs: &[&[Sample]], left_out: &mut [Sample], right_out: &mut [Sample]) {
        let block_size = self.block_size();
        debug_assert!(left_out.len() >= block_size && right_out.len() >= block_size);

        if !self.crossfading
            && let Some((filter, crossfade)) = self.queued.take()
        {
            self.begin_swap(filter, crossfade);
        }

        for (line, input) in self.histories.iter_mut().zip(inputs.iter().cycle()) {
            self.kernel.push_input(input, line);
        }

        let outputs = [left_out, right_out];
        for (ear, output) in outputs.into_iter().enumerate() {
            let line = &self.histories[self.role.input_for_ear(ear)];
            self.kernel.convolve(
                line,
                self.active.filter.ear(ear),
                &mut self.active.tails[ear],
                &mut output[..block_size],
            );

            if self.crossfading {
                self.kernel.convolve(
                    line,
                    self.incoming.filter.ear(ear),
                    &mut self.incoming.tails[ear],
                    &mut self.fade_buffers[ear],
                );

                let fade_length = self.fade_length as f64;
                for (i, (out, new)) in output
                    .iter_mut()
                    .zip(&self.fade_buffers[ear])
                    .take(block_size)
                    .enumerate()
                {
                    let w = ((self.fade_position + i + 1) as f64 / fade_length).min(1.0);
                    *out = *out * (1.0 - w) + new * w;
                }
            }
        }

        if self.crossfading {
            self.fade_position += block_size;
            if self.fade_position >= self.fade_length {
                self.finish_fade();
            }
        }
    }

    fn begin_swap(&mut self, filter: FilterPair, crossfade: bool) {
        let target_depth = if crossfade {
            filter.partition_count().max(self.active.filter.partition_count())
        } else {
            filter.partition_count()
        };
        if self.histories[0].depth() != target_depth {
            log::debug!(
                "Resizing delay line from {} to {} partitions",
                self.histories[0].depth(),
                target_depth
            );
            for line in &mut self.histories {
                line.resize(target_depth);
            }
        }

        self.incoming.filter = filter;
        for (ear, tail) in self.incoming.tails.iter_mut().enumerate() {
            let line = &self.histories[self.role.input_for_ear(ear)];
            self.kernel.prime(line, self.incoming.filter.ear(ear), tail);
        }

        if crossfade {
            self.crossfading = true;
            self.fade_position = 0;
        } else {
            std::mem::swap(&mut self.active, &mut self.incoming);
        }
    }

    fn finish_fade(&mut self) {
        if self.crossfading {
            std::mem::swap(&mut self.active, &mut self.incoming);
            self.crossfading = false;
        }
        self.fade_position = 0;

        let depth = self.active.filter.partition_count();
        for line in &mut self.histories {
            line.resize(depth);
        }
    }
}

impl Processor for PartitionedConvolver {
    /// Clear history and tails; a running crossfade completes immediately
    fn reset(&mut self) {
        self.finish_fade();
        for line in &mut self.histories {
            line.clear();
        }
        for tail in &mut self.active.tails {
            tail.fill(0.0);
        }
    }
}

// ============ Tests ============
