//! Run configuration
//!
//! Every component receives the settings it needs at construction. Defaults
//! mirror the tool's historical flag defaults.

use crate::codec::FormatVersion;
use crate::filter::DEFAULT_FILTER_CAPACITY;
use std::path::PathBuf;

/// Database tuning
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub bloom_filter_bits_per_key: f64,
    pub block_restart_interval: i32,
    pub block_cache_size: usize,
    pub table_cache_num_shard_bits: i32,
    pub max_open_files: i32,
    pub max_background_jobs: i32,
    pub max_log_file_size: usize,
    pub max_manifest_file_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bloom_filter_bits_per_key: 10.0,
            block_restart_interval: 16,
            block_cache_size: 1000 * 1024,
            table_cache_num_shard_bits: 2,
            max_open_files: 10_000,
            max_background_jobs: 2,
            max_log_file_size: 1024 * 1024,
            max_manifest_file_size: 1024 * 1024,
        }
    }
}

/// Producer/consumer hand-off
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Keys buffered between reader and writer; 0 hands each key over directly
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Plaintext local snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotFiles {
    pub meta: PathBuf,
    pub state: PathBuf,
}

impl Default for SnapshotFiles {
    fn default() -> Self {
        Self {
            meta: PathBuf::from("./mainnet.snapshot.meta"),
            state: PathBuf::from("./mainnet.snapshot.state"),
        }
    }
}

/// Building the local snapshot database
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub ls_db_dir: PathBuf,
    pub spent_addresses_db_dir: PathBuf,
    pub files: SnapshotFiles,
    pub ingest: IngestConfig,
    pub store: StoreConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            ls_db_dir: PathBuf::from("./localsnapshots-db"),
            spent_addresses_db_dir: PathBuf::from("./spent-addresses-db"),
            files: SnapshotFiles::default(),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Producing an export file
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub ls_db_dir: PathBuf,
    pub file: PathBuf,
    pub format: FormatVersion,
    pub omit_spent_addresses: bool,
    /// Maximum spent addresses a cuckoo filter is sized for
    pub filter_capacity: usize,
    pub store: StoreConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ls_db_dir: PathBuf::from("./localsnapshots-db"),
            file: PathBuf::from("export.bin"),
            format: FormatVersion::CURRENT,
            omit_spent_addresses: false,
            filter_capacity: DEFAULT_FILTER_CAPACITY,
            store: StoreConfig::default(),
        }
    }
}

/// Merging spent address sources
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Database directories or `.txt` address lists
    pub sources: Vec<PathBuf>,
    pub target: PathBuf,
    pub ingest: IngestConfig,
    pub store: StoreConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            target: PathBuf::from("./merged-spent-addresses-db"),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
        }
    }
}
