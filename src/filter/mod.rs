//! Probabilistic spent address set

pub mod cuckoo;

pub use cuckoo::{FilterBuildReport, SpentAddressFilter, DEFAULT_FILTER_CAPACITY};
