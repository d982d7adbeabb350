//! Filter repository
//!
//! Loads every filter named in the filter list once at startup, partitions
//! and transforms it, and serves the result by key. The repository is
//! immutable after loading; convolvers hold `Arc`s to the partition sets they
//! use, so dropping the repository never invalidates a running filter.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rayon::prelude::*;

use binsim_core::{FilterKey, Sample, partition_count};
use binsim_dsp::{FftPlan, FilterPair};
use binsim_file::read_audio;

use crate::catalog::{CatalogEntry, read_catalog};
use crate::{FilterError, FilterResult};

/// Filters indexed by key
pub struct FilterRepository {
    filters: HashMap<FilterKey, FilterPair>,
    /// Keys in filter list order
    order: Vec<FilterKey>,
    headphone: Option<FilterPair>,
    default_key: Option<FilterKey>,
    filter_size: usize,
    plan: FftPlan,
}

impl FilterRepository {
    /// Empty repository for the given sizes
    pub fn new(filter_size: usize, block_size: usize) -> Self {
        Self {
            filters: HashMap::new(),
            order: Vec::new(),
            headphone: None,
            default_key: None,
            filter_size,
            plan: FftPlan::new(block_size),
        }
    }

    /// Load every filter named in a filter list file
    ///
    /// `sample_rate` is only used to warn about filters recorded at a
    /// different rate.
    pub fn load<P: AsRef<Path>>(
        list_path: P,
        filter_size: usize,
        block_size: usize,
        sample_rate: u32,
    ) -> FilterResult<Self> {
        let list_path = list_path.as_ref();
        let entries = read_catalog(list_path)?;
        log::info!(
            "Loading {} filters from {}",
            entries.len(),
            list_path.display()
        );
        Self::load_entries(entries, filter_size, block_size, sample_rate)
    }

    /// Load filters from already parsed entries
    pub fn load_entries(
        entries: Vec<CatalogEntry>,
        filter_size: usize,
        block_size: usize,
        sample_rate: u32,
    ) -> FilterResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(&entry.key) {
                return Err(FilterError::DuplicateKey {
                    line: entry.line,
                    key: entry.key.clone(),
                });
            }
        }

        let mut repository = Self::new(filter_size, block_size);
        let plan = repository.plan.clone();

        let loaded: Vec<FilterPair> = entries
            .par_iter()
            .map(|entry| load_filter(entry, filter_size, sample_rate, &plan))
            .collect::<FilterResult<_>>()?;

        for (entry, filter) in entries.into_iter().zip(loaded) {
            repository.store(entry.key, filter);
        }

        log::info!(
            "Loaded {} filters ({} partitions of {} samples each, headphone filter: {})",
            repository.len(),
            repository.partition_count(),
            block_size,
            if repository.headphone.is_some() { "yes" } else { "no" }
        );
        Ok(repository)
    }

    /// Add a filter from time-domain impulse responses
    pub fn insert(&mut self, key: FilterKey, left: &[Sample], right: &[Sample]) -> FilterResult<()> {
        if self.filters.contains_key(&key) || (key.is_headphone() && self.headphone.is_some()) {
            return Err(FilterError::DuplicateKey { line: 0, key });
        }
        let filter =
            FilterPair::from_impulse_responses(left, right, self.filter_size, &self.plan)?;
        self.store(key, filter);
        Ok(())
    }

    fn store(&mut self, key: FilterKey, filter: FilterPair) {
        if key.is_headphone() {
            self.headphone = Some(filter);
            return;
        }
        if self.default_key.is_none() {
            self.default_key = Some(FilterKey::zeros(key.len()));
        }
        self.order.push(key.clone());
        self.filters.insert(key, filter);
    }

    /// Exact-match lookup
    pub fn lookup(&self, key: &FilterKey) -> FilterResult<&FilterPair> {
        self.get(key)
            .ok_or_else(|| FilterError::NotFound(key.clone()))
    }

    /// Exact-match lookup without building an error
    ///
    /// Never allocates, so the render thread uses this one.
    #[inline]
    pub fn get(&self, key: &FilterKey) -> Option<&FilterPair> {
        if key.is_headphone() {
            return self.headphone.as_ref();
        }
        self.filters.get(key)
    }

    /// Headphone equalization filter, if the list has one
    pub fn headphone_filter(&self) -> Option<&FilterPair> {
        self.headphone.as_ref()
    }

    /// All-zero key shaped like the first listed filter
    pub fn default_key(&self) -> Option<&FilterKey> {
        self.default_key.as_ref()
    }

    /// Source filter keys in list order
    pub fn keys(&self) -> impl Iterator<Item = &FilterKey> {
        self.order.iter()
    }

    /// Number of source filters (the headphone filter is not counted)
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn block_size(&self) -> usize {
        self.plan.block_size()
    }

    pub fn partition_count(&self) -> usize {
        partition_count(self.filter_size, self.plan.block_size())
    }

    /// FFT plan shared with the convolvers
    pub fn plan(&self) -> &FftPlan {
        &self.plan
    }
}

impl std::fmt::Debug for FilterRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRepository")
            .field("filters", &self.filters.len())
            .field("headphone", &self.headphone.is_some())
            .field("filter_size", &self.filter_size)
            .field("block_size", &self.plan.block_size())
            .finish()
    }
}

fn load_filter(
    entry: &CatalogEntry,
    filter_size: usize,
    sample_rate: u32,
    plan: &FftPlan,
) -> FilterResult<FilterPair> {
    let data = read_audio(&entry.path).map_err(|source| FilterError::FilterFile {
        path: entry.path.clone(),
        source,
    })?;

    if data.num_channels() != 2 {
        return Err(FilterError::ChannelCount {
            path: entry.path.clone(),
            channels: data.num_channels(),
        });
    }
    let frames = data.num_frames();
    if frames > filter_size {
        return Err(FilterError::Malformed {
            path: entry.path.clone(),
            frames,
            filter_size,
        });
    }
    if data.sample_rate != sample_rate {
        log::warn!(
            "Filter {} is {} Hz, session runs at {} Hz",
            entry.path.display(),
            data.sample_rate,
            sample_rate
        );
    }

    let filter = FilterPair::from_impulse_responses(
        &data.channels[0][..frames],
        &data.channels[1][..frames],
        filter_size,
        plan,
    )?;
    log::debug!("Loaded filter '{}' from {}", entry.key, entry.path.display());
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use binsim_core::KeyComponent;

    fn key(values: &[i64]) -> FilterKey {
        values.iter().map(|&v| KeyComponent::Int(v)).collect()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut repo = FilterRepository::new(64, 32);
        repo.insert(key(&[0, 0]), &[1.0], &[0.5]).unwrap();
        repo.insert(key(&[5, 0]), &[0.0, 1.0], &[0.0]).unwrap();

        assert_eq!(repo.len(), 2);
        assert_eq!(repo.partition_count(), 2);
        assert!(repo.lookup(&key(&[5, 0])).is_ok());
        assert_eq!(repo.keys().cloned().collect::<Vec<_>>(), vec![key(&[0, 0]), key(&[5, 0])]);
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut repo = FilterRepository::new(32, 32);
        repo.insert(key(&[10, 0]), &[1.0], &[1.0]).unwrap();

        let err = repo.lookup(&key(&[10])).unwrap_err();
        assert!(matches!(err, FilterError::NotFound(_)));
        assert!(!err.is_load_error());
        assert!(repo.lookup(&key(&[10, 0, 0])).is_err());
    }

    #[test]
    fn test_default_key_follows_first_source_filter() {
        let mut repo = FilterRepository::new(32, 32);
        assert!(repo.default_key().is_none());

        repo.insert(FilterKey::headphone(), &[1.0], &[1.0]).unwrap();
        repo.insert(key(&[90, 10, 2]), &[1.0], &[1.0]).unwrap();
        assert_eq!(repo.default_key(), Some(&FilterKey::zeros(3)));
        assert_eq!(repo.len(), 1);
        assert!(repo.headphone_filter().is_some());
        assert!(repo.lookup(&FilterKey::headphone()).is_ok());
    }

    #[test]
    fn test_insert_rejects_duplicates_and_long_filters() {
        let mut repo = FilterRepository::new(4, 2);
        repo.insert(key(&[1]), &[1.0], &[1.0]).unwrap();
        assert!(matches!(
            repo.insert(key(&[1]), &[1.0], &[1.0]),
            Err(FilterError::DuplicateKey { .. })
        ));
        assert!(matches!(
            repo.insert(key(&[2]), &[0.0; 5], &[0.0; 5]),
            Err(FilterError::Dsp(_))
        ));
    }

    #[test]
    fn test_duplicate_entries_name_line() {
        let entries = vec![
            CatalogEntry { line: 1, key: key(&[0]), path: "a.wav".into() },
            CatalogEntry { line: 4, key: key(&[0]), path: "b.wav".into() },
        ];
        match FilterRepository::load_entries(entries, 64, 32, 44100) {
            Err(FilterError::DuplicateKey { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
