//! Concurrent aggregation of detail records.
//!
//! This module turns the market listing into the deduplicated, sorted
//! set of free products.

pub mod aggregator;

pub use aggregator::*;
