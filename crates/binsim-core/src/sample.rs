//! Sample types and block buffers

/// Type alias for audio samples (f64 throughout the processing chain)
pub type Sample = f64;

/// Stereo block buffer (split left/right)
#[derive(Debug, Clone)]
pub struct StereoBlock {
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl StereoBlock {
    pub fn new(size: usize) -> Self {
        Self {
            left: vec![0.0; size],
            right: vec![0.0; size],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    /// Both halves mutably at once
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [Sample], &mut [Sample]) {
        (&mut self.left, &mut self.right)
    }

    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    /// Multiply both channels by `gain`
    pub fn scale(&mut self, gain: Sample) {
        for sample in self.left.iter_mut().chain(self.right.iter_mut()) {
            *sample *= gain;
        }
    }

    /// Write as interleaved `f32` (L, R, L, R, ...)
    ///
    /// `output` must hold at least `2 * len()` samples.
    pub fn write_interleaved(&self, output: &mut [f32]) {
        for (frame, (&l, &r)) in output
            .chunks_exact_mut(2)
            .zip(self.left.iter().zip(self.right.iter()))
        {
            frame[0] = l as f32;
            frame[1] = r as f32;
        }
    }
}

/// Multi-channel input block: `channels` rows of `block_size` samples
#[derive(Debug, Clone)]
pub struct InputBlock {
    data: Vec<Sample>,
    channels: usize,
    block_size: usize,
}

impl InputBlock {
    pub fn new(channels: usize, block_size: usize) -> Self {
        Self {
            data: vec![0.0; channels * block_size],
            channels,
            block_size,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        let start = index * self.block_size;
        &self.data[start..start + self.block_size]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [Sample] {
        let start = index * self.block_size;
        &mut self.data[start..start + self.block_size]
    }

    /// Zero every channel from frame `from` to the end of the block
    pub fn clear_from(&mut self, from: usize) {
        let from = from.min(self.block_size);
        for ch in 0..self.channels {
            self.channel_mut(ch)[from..].fill(0.0);
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}
