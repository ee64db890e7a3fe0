//! Export file versions
//!
//! Each version byte maps to one row of [`FORMATS`]. Version bytes are never
//! reused: a file whose first (decompressed) byte is not in the table is
//! rejected before anything else is read.

use crate::codec::wire::Endian;
use crate::error::{ConfigurationError, FormatError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How spent addresses are carried in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpentEncoding {
    /// Serialized cuckoo filter, preceded by its i32 byte length
    CuckooFilter,
    /// Flat run of 49-byte hashes
    RawList,
}

/// Layout rules for one version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub version: u8,
    pub endian: Endian,
    pub gzip: bool,
    pub digest_trailer: bool,
    pub spent: SpentEncoding,
}

/// Version dispatch table
pub const FORMATS: [FormatSpec; 2] = [
    FormatSpec {
        version: 2,
        endian: Endian::Big,
        gzip: true,
        digest_trailer: false,
        spent: SpentEncoding::CuckooFilter,
    },
    FormatSpec {
        version: 3,
        endian: Endian::Little,
        gzip: false,
        digest_trailer: true,
        spent: SpentEncoding::RawList,
    },
];

/// A supported export file generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    /// Gzip compressed, big-endian, spent addresses as a cuckoo filter
    Gzipped,
    /// Raw, little-endian, spent addresses listed, SHA-256 trailer
    Checksummed,
}

impl FormatVersion {
    /// The version written by default
    pub const CURRENT: FormatVersion = FormatVersion::Checksummed;

    pub fn spec(self) -> &'static FormatSpec {
        match self {
            FormatVersion::Gzipped => &FORMATS[0],
            FormatVersion::Checksummed => &FORMATS[1],
        }
    }

    pub fn byte(self) -> u8 {
        self.spec().version
    }

    pub fn from_byte(byte: u8) -> Result<Self, FormatError> {
        [FormatVersion::Gzipped, FormatVersion::Checksummed]
            .into_iter()
            .find(|v| v.byte() == byte)
            .ok_or_else(|| FormatError::UnsupportedVersion {
                found: byte,
                supported: FORMATS.iter().map(|f| f.version).collect(),
            })
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::Gzipped => f.write_str("gzipped"),
            FormatVersion::Checksummed => f.write_str("checksummed"),
        }
    }
}

impl FromStr for FormatVersion {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzipped" | "gzip" | "2" => Ok(FormatVersion::Gzipped),
            "checksummed" | "raw" | "3" => Ok(FormatVersion::Checksummed),
            other => Err(ConfigurationError::Invalid(format!(
                "unknown export format {:?}, expected 'gzipped' or 'checksummed'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bytes_are_distinct() {
        assert_ne!(FormatVersion::Gzipped.byte(), FormatVersion::Checksummed.byte());
        for spec in FORMATS {
            let version = FormatVersion::from_byte(spec.version).unwrap();
            assert_eq!(version.spec(), &spec);
        }
    }

    #[test]
    fn test_generations_differ_in_endianness() {
        assert_eq!(FormatVersion::Gzipped.spec().endian, Endian::Big);
        assert_eq!(FormatVersion::Checksummed.spec().endian, Endian::Little);
        assert!(FormatVersion::Checksummed.spec().digest_trailer);
        assert!(!FormatVersion::Gzipped.spec().digest_trailer);
    }

    #[test]
    fn test_unknown_version_byte() {
        let err = FormatVersion::from_byte(1).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnsupportedVersion {
                found: 1,
                supported: vec![2, 3]
            }
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("gzipped".parse::<FormatVersion>().unwrap(), FormatVersion::Gzipped);
        assert_eq!("3".parse::<FormatVersion>().unwrap(), FormatVersion::Checksummed);
        assert!("zip".parse::<FormatVersion>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for version in [FormatVersion::Gzipped, FormatVersion::Checksummed] {
            assert_eq!(version.to_string().parse::<FormatVersion>().unwrap(), version);
        }
        assert_eq!(FormatVersion::CURRENT.to_string(), "checksummed");
    }
}
