//! Frequency-domain filter partitions
//!
//! An impulse response of `filter_size` samples is cut into
//! `ceil(filter_size / block_size)` segments of `block_size` samples. Each
//! segment is zero-padded to `2 * block_size` and real-FFT'd once at load
//! time, so the real-time path never transforms filter data.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use binsim_core::{Sample, partition_count};

use crate::{DspError, DspResult};

// ============ FFT Plan ============

/// Forward/inverse real FFT pair for a given block size
#[derive(Clone)]
pub struct FftPlan {
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    block_size: usize,
}

impl FftPlan {
    pub fn new(block_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        Self {
            forward: planner.plan_fft_forward(block_size * 2),
            inverse: planner.plan_fft_inverse(block_size * 2),
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Transform length (`2 * block_size`)
    #[inline]
    pub fn fft_size(&self) -> usize {
        self.block_size * 2
    }

    /// Number of complex bins of the half spectrum
    #[inline]
    pub fn bins(&self) -> usize {
        self.block_size + 1
    }

    pub(crate) fn forward(&self) -> &Arc<dyn RealToComplex<f64>> {
        &self.forward
    }

    pub(crate) fn inverse(&self) -> &Arc<dyn ComplexToReal<f64>> {
        &self.inverse
    }
}

impl std::fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPlan")
            .field("block_size", &self.block_size)
            .finish()
    }
}

// ============ Partition Set ============

/// One channel of an impulse response as frequency-domain partitions
#[derive(Debug, Clone)]
pub struct FilterPartitionSet {
    /// Half spectra, `block_size + 1` bins each
    partitions: Vec<Vec<Complex<f64>>>,
    block_size: usize,
}

impl FilterPartitionSet {
    /// Partition and transform an impulse response
    ///
    /// Responses shorter than `filter_size` are zero-padded; longer ones are
    /// rejected.
    pub fn from_impulse_response(
        ir: &[Sample],
        filter_size: usize,
        plan: &FftPlan,
    ) -> DspResult<Self> {
        if ir.len() > filter_size {
            return Err(DspError::FilterTooLong {
                len: ir.len(),
                max: filter_size,
            });
        }

        let block_size = plan.block_size();
        let count = partition_count(filter_size, block_size);
        let mut padded = plan.forward().make_input_vec();
        let mut scratch = plan.forward().make_scratch_vec();

        let mut partitions = Vec::with_capacity(count);
        for k in 0..count {
            padded.fill(0.0);
            let start = (k * block_size).min(ir.len());
            let end = ((k + 1) * block_size).min(ir.len());
            padded[..end - start].copy_from_slice(&ir[start..end]);

            let mut spectrum = plan.forward().make_output_vec();
            plan.forward()
                .process_with_scratch(&mut padded, &mut spectrum, &mut scratch)
                .map_err(|e| DspError::Fft(e.to_string()))?;
            partitions.push(spectrum);
        }

        Ok(Self {
            partitions,
            block_size,
        })
    }

    /// All-zero filter with `count` partitions
    pub fn silent(block_size: usize, count: usize) -> Self {
        Self {
            partitions: vec![vec![Complex::new(0.0, 0.0); block_size + 1]; count.max(1)],
            block_size,
        }
    }

    #[inline]
    pub fn partitions(&self) -> &[Vec<Complex<f64>>] {
        &self.partitions
    }

    #[inline]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Inverse-transform every partition and drop the padding
    ///
    /// Returns `partition_count * block_size` samples.
    pub fn to_impulse_response(&self, plan: &FftPlan) -> DspResult<Vec<Sample>> {
        let norm = 1.0 / plan.fft_size() as f64;
        let mut spectrum = plan.inverse().make_input_vec();
        let mut time = plan.inverse().make_output_vec();
        let mut scratch = plan.inverse().make_scratch_vec();

        let mut ir = Vec::with_capacity(self.partitions.len() * self.block_size);
        for partition in &self.partitions {
            spectrum.copy_from_slice(partition);
            plan.inverse()
                .process_with_scratch(&mut spectrum, &mut time, &mut scratch)
                .map_err(|e| DspError::Fft(e.to_string()))?;
            ir.extend(time[..self.block_size].iter().map(|s| s * norm));
        }
        Ok(ir)
    }
}

// ============ Filter Pair ============

/// Left/right partition sets of one impulse response
///
/// Cloning only bumps reference counts, so the real-time thread can take a
/// copy out of the repository without allocating.
#[derive(Debug, Clone)]
pub struct FilterPair {
    pub left: Arc<FilterPartitionSet>,
    pub right: Arc<FilterPartitionSet>,
}

impl FilterPair {
    pub fn new(left: FilterPartitionSet, right: FilterPartitionSet) -> DspResult<Self> {
        if left.block_size() != right.block_size() {
            return Err(DspError::BlockSizeMismatch {
                expected: left.block_size(),
                got: right.block_size(),
            });
        }
        Ok(Self {
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// Transform a stereo impulse response
    pub fn from_impulse_responses(
        left: &[Sample],
        right: &[Sample],
        filter_size: usize,
        plan: &FftPlan,
    ) -> DspResult<Self> {
        Self::new(
            FilterPartitionSet::from_impulse_response(left, filter_size, plan)?,
            FilterPartitionSet::from_impulse_response(right, filter_size, plan)?,
        )
    }

    pub fn silent(block_size: usize, count: usize) -> Self {
        let set = Arc::new(FilterPartitionSet::silent(block_size, count));
        Self {
            left: Arc::clone(&set),
            right: set,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.left.block_size()
    }

    /// Partition set for ear 0 (left) or 1 (right)
    #[inline]
    pub fn ear(&self, ear: usize) -> &FilterPartitionSet {
        if ear == 0 { &self.left } else { &self.right }
    }

    /// Partitions of the longer channel
    #[inline]
    pub fn partition_count(&self) -> usize {
        self.left.partition_count().max(self.right.partition_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_count_and_bins() {
        let plan = FftPlan::new(64);
        let ir = vec![0.5; 150];
        let set = FilterPartitionSet::from_impulse_response(&ir, 200, &plan).unwrap();

        assert_eq!(set.partition_count(), 4); // ceil(200 / 64)
        assert!(set.partitions().iter().all(|p| p.len() == 65));
    }

    #[test]
    fn test_too_long_is_rejected() {
        let plan = FftPlan::new(64);
        let ir = vec![0.0; 129];
        let err = FilterPartitionSet::from_impulse_response(&ir, 128, &plan).unwrap_err();
        assert!(matches!(err, DspError::FilterTooLong { len: 129, max: 128 }));
    }

    #[test]
    fn test_round_trip_reconstructs_ir() {
        let plan = FftPlan::new(32);
        let ir: Vec<f64> = (0..80).map(|i| ((i as f64) * 0.37).sin()).collect();
        let set = FilterPartitionSet::from_impulse_response(&ir, 96, &plan).unwrap();

        let rebuilt = set.to_impulse_response(&plan).unwrap();
        assert_eq!(rebuilt.len(), 96);
        for (i, &s) in rebuilt.iter().enumerate() {
            let expected = ir.get(i).copied().unwrap_or(0.0);
            assert!((s - expected).abs() < 1e-12, "sample {i}: {s} vs {expected}");
        }
    }

    #[test]
    fn test_silent_pair_shares_storage() {
        let pair = FilterPair::silent(16, 3);
        assert!(Arc::ptr_eq(&pair.left, &pair.right));
        assert_eq!(pair.partition_count(), 3);
        assert_eq!(pair.block_size(), 16);
    }

    #[test]
    fn test_pair_rejects_mismatched_blocks() {
        let a = FilterPartitionSet::silent(16, 1);
        let b = FilterPartitionSet::silent(32, 1);
        assert!(FilterPair::new(a, b).is_err());
    }
}
