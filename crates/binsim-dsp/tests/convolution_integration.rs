//! Convolution Integration Tests
//!
//! Verifies the convolver against time-domain references at realistic sizes:
//! - Long filters (many partitions) against direct convolution
//! - Filter swaps while a signal is running
//! - Signal path integrity (no NaN/Inf)

use approx::assert_abs_diff_eq;
use binsim_dsp::{ConvolverRole, FftPlan, FilterPair, FilterPartitionSet, PartitionedConvolver, Processor};

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK_SIZE: usize = 256;

/// Generate test sine wave
fn generate_sine(samples: usize, freq: f64) -> Vec<f64> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Generate white noise
fn generate_noise(samples: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            i.hash(&mut hasher);
            let h = hasher.finish();
            (h as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Decaying noise, shaped like a measured room response
fn generate_ir(samples: usize, decay: f64) -> Vec<f64> {
    generate_noise(samples)
        .into_iter()
        .enumerate()
        .map(|(i, s)| s * (-(i as f64) / decay).exp())
        .collect()
}

fn direct_convolution(signal: &[f64], ir: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; signal.len()];
    for (n, y) in out.iter_mut().enumerate() {
        for (k, h) in ir.iter().enumerate().take(n + 1) {
            *y += h * signal[n - k];
        }
    }
    out
}

fn render(conv: &mut PartitionedConvolver, signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut l = vec![0.0; BLOCK_SIZE];
    let mut r = vec![0.0; BLOCK_SIZE];
    for block in signal.chunks(BLOCK_SIZE) {
        conv.process(block, &mut l, &mut r);
        left.extend_from_slice(&l);
        right.extend_from_slice(&r);
    }
    (left, right)
}

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCE COMPARISON
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_long_filter_matches_reference() {
    let filter_size = 2048;
    let plan = FftPlan::new(BLOCK_SIZE);
    let ir_l = generate_ir(2000, 400.0);
    let ir_r: Vec<f64> = ir_l.iter().map(|s| -0.5 * s).collect();
    let filter = FilterPair::from_impulse_responses(&ir_l, &ir_r, filter_size, &plan).unwrap();
    assert_eq!(filter.partition_count(), 8);

    let mut conv = PartitionedConvolver::with_plan(ConvolverRole::Source, plan, 8, 1);
    conv.set_ir(filter, false).unwrap();

    let signal = generate_sine(BLOCK_SIZE * 12, 440.0);
    let (left, right) = render(&mut conv, &signal);

    let expected_l = direct_convolution(&signal, &ir_l);
    let expected_r = direct_convolution(&signal, &ir_r);
    for i in 0..signal.len() {
        assert_abs_diff_eq!(left[i], expected_l[i], epsilon = 1e-8);
        assert_abs_diff_eq!(right[i], expected_r[i], epsilon = 1e-8);
    }
}

#[test]
fn test_partition_round_trip_at_session_size() {
    let plan = FftPlan::new(BLOCK_SIZE);
    let ir = generate_ir(1000, 200.0);
    let set = FilterPartitionSet::from_impulse_response(&ir, 1024, &plan).unwrap();

    let rebuilt = set.to_impulse_response(&plan).unwrap();
    assert_eq!(rebuilt.len(), 1024);
    for (i, s) in rebuilt.iter().enumerate() {
        assert_abs_diff_eq!(*s, ir.get(i).copied().unwrap_or(0.0), epsilon = 1e-12);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILTER SWAPS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_rotating_listener_stays_finite() {
    let filter_size = 1024;
    let plan = FftPlan::new(BLOCK_SIZE);
    let filters: Vec<FilterPair> = (0..4)
        .map(|n| {
            let ir = generate_ir(filter_size, 100.0 + 50.0 * n as f64);
            FilterPair::from_impulse_responses(&ir, &ir, filter_size, &plan).unwrap()
        })
        .collect();

    let mut conv = PartitionedConvolver::with_plan(ConvolverRole::Source, plan, 4, 2);
    let signal = generate_noise(BLOCK_SIZE);
    let mut l = vec![0.0; BLOCK_SIZE];
    let mut r = vec![0.0; BLOCK_SIZE];

    for block in 0..64 {
        conv.set_ir(filters[block % filters.len()].clone(), true).unwrap();
        conv.process(&signal, &mut l, &mut r);
        assert!(l.iter().chain(&r).all(|s| s.is_finite()));
    }
}

#[test]
fn test_swap_after_reset_is_exact() {
    let filter_size = 512;
    let plan = FftPlan::new(BLOCK_SIZE);
    let ir_a = generate_ir(filter_size, 80.0);
    let ir_b = generate_ir(filter_size, 160.0);
    let a = FilterPair::from_impulse_responses(&ir_a, &ir_a, filter_size, &plan).unwrap();
    let b = FilterPair::from_impulse_responses(&ir_b, &ir_b, filter_size, &plan).unwrap();

    let mut conv = PartitionedConvolver::with_plan(ConvolverRole::Source, plan, 2, 1);
    conv.set_ir(a, false).unwrap();
    render(&mut conv, &generate_noise(BLOCK_SIZE * 3));

    conv.reset();
    conv.set_ir(b, false).unwrap();
    let signal = generate_sine(BLOCK_SIZE * 4, 1000.0);
    let (left, _) = render(&mut conv, &signal);

    let expected = direct_convolution(&signal, &ir_b);
    for i in 0..signal.len() {
        assert_abs_diff_eq!(left[i], expected[i], epsilon = 1e-9);
    }
}
