//! Storage layer
//!
//! This module contains:
//! - The partitioned key-value store abstraction and its backends
//! - Streaming copy of spent addresses between stores
//! - Deduplicating merge of spent address sources

pub mod ingest;
pub mod kv;
pub mod memory;
pub mod merge;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use ingest::{ingest_spent_addresses, stream_keys, IngestReport};
pub use kv::{KeyValueStore, KvIter, KvPair, Partition, SPENT_ADDRESS_VALUE};
pub use memory::MemoryStore;
pub use merge::{
    merge_sources, MergeReport, MergeSource, SourceReport, SpentAddressMerger, StoreOpener,
    MIN_MERGE_SOURCES,
};
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;
