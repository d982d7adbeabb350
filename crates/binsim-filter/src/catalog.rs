//! Filter list parsing
//!
//! One filter per line, whitespace separated: the key components followed by
//! the path of a stereo audio file.
//!
//! ```text
//! # azimuth elevation file
//! 0 0 brirs/az0_el0.wav
//! 5 0 brirs/az5_el0.wav
//! HPFILTER brirs/headphone_eq.wav
//! ```
//!
//! Paths are used as written, relative paths resolve against the working
//! directory.

use std::path::{Path, PathBuf};

use binsim_core::{FilterKey, HEADPHONE_FILTER_TOKEN};

use crate::{FilterError, FilterResult};

/// One parsed filter list line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// 1-based line number in the list
    pub line: usize,
    pub key: FilterKey,
    pub path: PathBuf,
}

impl CatalogEntry {
    pub fn new(key: FilterKey, path: impl Into<PathBuf>) -> Self {
        Self {
            line: 0,
            key,
            path: path.into(),
        }
    }
}

/// Read and parse a filter list file
pub fn read_catalog<P: AsRef<Path>>(path: P) -> FilterResult<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| FilterError::CatalogIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text)
}

/// Parse filter list text
pub fn parse_catalog(text: &str) -> FilterResult<Vec<CatalogEntry>> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let Some((path, key_tokens)) = tokens.split_last() else {
            continue;
        };
        if key_tokens.is_empty() {
            return Err(FilterError::CatalogLine {
                line,
                reason: format!("expected key values before the file path, got '{trimmed}'"),
            });
        }
        if key_tokens.contains(&HEADPHONE_FILTER_TOKEN) && key_tokens.len() > 1 {
            return Err(FilterError::CatalogLine {
                line,
                reason: format!("{HEADPHONE_FILTER_TOKEN} must be the only key value"),
            });
        }

        entries.push(CatalogEntry {
            line,
            key: FilterKey::from_tokens(key_tokens.iter().copied()),
            path: PathBuf::from(path),
        });
    }

    Ok(entries)
}
