//! Filter Repository Load Tests
//!
//! Writes real WAV fixtures and filter lists to a temp directory and checks:
//! - Loading, lookup and the partition round trip
//! - Zero padding of short filters
//! - Every load failure the filter list can produce

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use binsim_core::{FilterKey, KeyComponent};
use binsim_dsp::FilterPartitionSet;
use binsim_file::{AudioData, write_wav};
use binsim_filter::{FilterError, FilterRepository};
use tempfile::TempDir;

const FILTER_SIZE: usize = 512;
const BLOCK_SIZE: usize = 128;
const SAMPLE_RATE: u32 = 44100;

fn write_ir(dir: &Path, name: &str, channels: Vec<Vec<f64>>) -> PathBuf {
    let path = dir.join(name);
    write_wav(
        &path,
        &AudioData {
            channels,
            sample_rate: SAMPLE_RATE,
        },
    )
    .unwrap();
    path
}

/// Exactly representable in f32, so WAV storage is lossless
fn decaying(len: usize, scale: f64) -> Vec<f64> {
    (0..len).map(|i| scale / (1 << (i % 12)) as f64).collect()
}

fn write_list(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("filter_list.txt");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn key(values: &[i64]) -> FilterKey {
    values.iter().map(|&v| KeyComponent::Int(v)).collect()
}

fn rebuild(set: &FilterPartitionSet, repo: &FilterRepository) -> Vec<f64> {
    set.to_impulse_response(repo.plan()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_load_and_round_trip() {
    let dir = TempDir::new().unwrap();
    let left = decaying(FILTER_SIZE, 0.5);
    let right = decaying(FILTER_SIZE, -0.25);
    let a = write_ir(dir.path(), "az0.wav", vec![left.clone(), right.clone()]);
    let b = write_ir(dir.path(), "az5.wav", vec![right.clone(), left.clone()]);
    let hp = write_ir(dir.path(), "hp.wav", vec![vec![1.0], vec![1.0]]);

    let list = write_list(
        dir.path(),
        &[
            "# azimuth elevation".to_string(),
            format!("0 0 {}", a.display()),
            format!("5 0 {}", b.display()),
            format!("HPFILTER {}", hp.display()),
        ],
    );

    let repo = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap();
    assert_eq!(repo.len(), 2);
    assert_eq!(repo.partition_count(), 4);
    assert_eq!(repo.default_key(), Some(&key(&[0, 0])));
    assert!(repo.headphone_filter().is_some());

    let filter = repo.lookup(&key(&[5, 0])).unwrap();
    assert_eq!(filter.left.partition_count(), 4);
    for (got, expected) in rebuild(&filter.left, &repo).iter().zip(&right) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-12);
    }
    for (got, expected) in rebuild(&filter.right, &repo).iter().zip(&left) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-12);
    }
}

#[test]
fn test_short_filter_is_zero_padded() {
    let dir = TempDir::new().unwrap();
    let short = decaying(100, 1.0);
    let path = write_ir(dir.path(), "short.wav", vec![short.clone(), short.clone()]);
    let list = write_list(dir.path(), &[format!("1 {}", path.display())]);

    let repo = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap();
    let filter = repo.lookup(&key(&[1])).unwrap();
    let ir = rebuild(&filter.left, &repo);

    assert_eq!(ir.len(), FILTER_SIZE);
    for (i, s) in ir.iter().enumerate() {
        let expected = short.get(i).copied().unwrap_or(0.0);
        assert_abs_diff_eq!(*s, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_sample_rate_mismatch_still_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_ir(dir.path(), "ir.wav", vec![vec![1.0], vec![1.0]]);
    let list = write_list(dir.path(), &[format!("0 {}", path.display())]);

    let repo = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, 48000).unwrap();
    assert_eq!(repo.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOAD FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_too_long_filter_is_malformed() {
    let dir = TempDir::new().unwrap();
    let long = vec![0.0; FILTER_SIZE + 1];
    let path = write_ir(dir.path(), "long.wav", vec![long.clone(), long]);
    let list = write_list(dir.path(), &[format!("0 {}", path.display())]);

    let err = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap_err();
    assert!(matches!(err, FilterError::Malformed { frames, .. } if frames == FILTER_SIZE + 1));
}

#[test]
fn test_mono_filter_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_ir(dir.path(), "mono.wav", vec![vec![1.0; 10]]);
    let list = write_list(dir.path(), &[format!("0 {}", path.display())]);

    let err = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap_err();
    assert!(matches!(err, FilterError::ChannelCount { channels: 1, .. }));
}

#[test]
fn test_missing_filter_file() {
    let dir = TempDir::new().unwrap();
    let list = write_list(
        dir.path(),
        &[format!("0 {}", dir.path().join("nope.wav").display())],
    );

    let err = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap_err();
    assert!(matches!(err, FilterError::FilterFile { .. }));
    assert!(err.is_load_error());
}

#[test]
fn test_malformed_line_names_line_number() {
    let dir = TempDir::new().unwrap();
    let path = write_ir(dir.path(), "ir.wav", vec![vec![1.0], vec![1.0]]);
    let list = write_list(
        dir.path(),
        &[
            format!("0 {}", path.display()),
            String::new(),
            "orphan.wav".to_string(),
        ],
    );

    let err = FilterRepository::load(&list, FILTER_SIZE, BLOCK_SIZE, SAMPLE_RATE).unwrap_err();
    assert!(matches!(err, FilterError::CatalogLine { line: 3, .. }));
    assert!(err.to_string().contains("line 3"));
}
