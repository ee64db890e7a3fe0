//! Error taxonomy shared by every component
//!
//! Every core operation fails fast with one of these. Non-fatal conditions
//! (duplicate addresses, failed filter insertions, supply mismatches) are
//! never errors; they are counted in the reports returned by each component.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Stream(#[from] io::Error),
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Attach a path to an IO error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Malformed textual or binary input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("file version {found} is not supported, supported versions: {supported:?}")]
    UnsupportedVersion { found: u8, supported: Vec<u8> },
    #[error("version {version} must {expected} gzip compressed")]
    ContainerMismatch { version: u8, expected: &'static str },
    #[error("invalid tryte {ch:?} at position {position}")]
    InvalidTryte { ch: char, position: usize },
    #[error("byte {byte:#04x} at position {position} is not a valid T5B1 trit group")]
    InvalidTritByte { byte: u8, position: usize },
    #[error("address has {len} trytes, expected at most {max}")]
    AddressLength { len: usize, max: usize },
    #[error("hash must be {expected} bytes, got {actual}")]
    HashLength { expected: usize, actual: usize },
    #[error("{source_name} line {line}: {reason}")]
    Line {
        source_name: String,
        line: usize,
        reason: String,
    },
    #[error("{source_name}: missing header line {line} ({field})")]
    MissingHeader {
        source_name: String,
        line: usize,
        field: &'static str,
    },
    #[error("unexpected end of data while reading {section}")]
    Truncated { section: &'static str },
    #[error("{count} trailing bytes after the last section")]
    TrailingBytes { count: usize },
    #[error("negative {field} count: {value}")]
    NegativeCount { field: &'static str, value: i32 },
    #[error("{field} count {count} does not fit the file format")]
    CountOverflow { field: &'static str, count: usize },
    #[error("duplicate key in {section}: {key}")]
    DuplicateKey { section: &'static str, key: String },
    #[error("gzip stream: {0}")]
    Gzip(String),
    #[error("decompressed content exceeds {limit} bytes")]
    Oversized { limit: u64 },
}

/// Digest or element count mismatches
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("file digest mismatch: trailer {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("spent addresses count between the cuckoo filter ({filter}) and the header ({header}) doesn't match")]
    FilterCount { filter: usize, header: usize },
    #[error("couldn't reconstruct the cuckoo filter: {0}")]
    CorruptFilter(String),
    #[error("{declared} spent addresses declared but {written} supplied")]
    ListCount { declared: usize, written: usize },
    #[error("file is {size} bytes, too short to hold the {trailer} byte digest trailer")]
    MissingTrailer { size: usize, trailer: usize },
}

/// Settings that cannot accommodate the data being processed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("the capacity of the cuckoo filter is too low to contain the spent addresses: spent addresses {addresses} vs. CF capacity {capacity}")]
    FilterCapacity { addresses: usize, capacity: usize },
    #[error("you must define at least {min} spent-addresses sources, got {got}")]
    TooFewSources { min: usize, got: usize },
    #[error("no local snapshot persisted in {0:?}")]
    NoSnapshot(PathBuf),
    #[error("{0}")]
    Invalid(String),
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Store(err.into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err: Error = IntegrityError::FilterCount {
            filter: 9,
            header: 10,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("(9)"));
        assert!(msg.contains("(10)"));
        assert!(err.is_integrity());

        let err: Error = FormatError::UnsupportedVersion {
            found: 7,
            supported: vec![2, 3],
        }
        .into();
        assert!(err.to_string().contains("file version 7"));
        assert!(err.is_format());
    }
}
