//! binsim-filter: impulse response storage for BinSim
//!
//! Reads the filter list, decodes each stereo impulse response, partitions
//! and transforms it for the convolvers, and serves the result by
//! [`FilterKey`](binsim_core::FilterKey).

pub mod catalog;
pub mod error;
pub mod repository;

pub use catalog::{CatalogEntry, parse_catalog, read_catalog};
pub use error::{FilterError, FilterResult};
pub use repository::FilterRepository;
