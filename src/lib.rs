//! ls-tool: local snapshot interchange in Rust
//!
//! This crate moves a ledger checkpoint between a node's database and a
//! portable single-file format:
//! - Plaintext snapshot parsing with a total supply check
//! - Big-endian store encoding and two export file generations
//!   (gzipped with a cuckoo filter, or raw with a SHA-256 trailer)
//! - Streaming ingest and deduplicating merge of spent addresses
//! - RocksDB persistence behind a partitioned key-value trait
//!
//! # Example
//!
//! ```rust
//! use ls_tool::codec::{decode_export, encode_export, FormatVersion, SpentPayload};
//! use ls_tool::core::SnapshotState;
//! use std::io::Cursor;
//!
//! let meta = "HASHM\n100\n1600000000\n1\n0\nHASHA;50\n";
//! let state = "HASHA;1000\nHASHB;2000\n";
//! let snapshot =
//!     SnapshotState::from_readers(Cursor::new(meta), "meta", Cursor::new(state), "state").unwrap();
//!
//! let bytes = encode_export(Vec::new(), FormatVersion::Checksummed, &snapshot, SpentPayload::Omitted)
//!     .unwrap();
//! let file = decode_export(&bytes).unwrap();
//! assert_eq!(file.snapshot, snapshot);
//! ```

#[cfg(feature = "rocksdb")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use codec::{decode_export, encode_export, FormatVersion};
pub use config::{BuildConfig, ExportConfig, IngestConfig, MergeConfig, SnapshotFiles, StoreConfig};
pub use core::{Hash, SnapshotState};
pub use error::{Error, Result};
pub use filter::SpentAddressFilter;
pub use pipeline::{ExportPipeline, ExportSummary, SnapshotBuilder};
pub use storage::{KeyValueStore, MemoryStore, Partition, SpentAddressMerger};
#[cfg(feature = "rocksdb")]
pub use storage::RocksStore;
