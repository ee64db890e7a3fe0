//! Spent address cuckoo filter
//!
//! A compact approximate-membership set over spent addresses. Successfully
//! inserted addresses are always found again; other addresses may be
//! reported present with a small false-positive rate. Contents cannot be
//! enumerated.
//!
//! Image layout: u64 LE element count, u64 LE fingerprint byte length,
//! fingerprint bytes. The export format treats it as opaque.

use crate::core::Hash;
use crate::error::{ConfigurationError, IntegrityError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use cuckoofilter::{CuckooFilter, ExportedCuckooFilter};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;

/// Fingerprint bytes per bucket in the underlying filter
const BUCKET_BYTES: usize = 4;

const IMAGE_HEADER_BYTES: usize = 16;

/// Default maximum number of spent addresses
pub const DEFAULT_FILTER_CAPACITY: usize = 50_000_000;

// =============================================================================
// Build Report
// =============================================================================

/// Outcome of populating a filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterBuildReport {
    pub capacity: usize,
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub size_bytes: usize,
}

// =============================================================================
// Filter
// =============================================================================

pub struct SpentAddressFilter {
    filter: CuckooFilter<DefaultHasher>,
}

impl SpentAddressFilter {
    /// Empty filter able to hold `capacity` addresses
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            filter: CuckooFilter::with_capacity(capacity),
        }
    }

    /// Build a filter over `expected` addresses
    ///
    /// Fails before inserting anything when `expected` exceeds `capacity`.
    /// Individual insertion failures are counted, not fatal.
    pub fn build<I>(capacity: usize, expected: usize, addresses: I) -> Result<(Self, FilterBuildReport)>
    where
        I: IntoIterator<Item = Result<Hash>>,
    {
        if expected > capacity {
            return Err(ConfigurationError::FilterCapacity {
                addresses: expected,
                capacity,
            }
            .into());
        }

        let mut filter = Self::with_capacity(capacity);
        let mut report = FilterBuildReport {
            capacity,
            ..Default::default()
        };

        for address in addresses {
            let address = address?;
            if report.attempted == capacity {
                return Err(ConfigurationError::FilterCapacity {
                    addresses: report.attempted + 1,
                    capacity,
                }
                .into());
            }
            report.attempted += 1;
            if filter.insert(&address) {
                report.inserted += 1;
            } else {
                report.failed += 1;
            }
            if report.attempted % 1_000_000 == 0 {
                log::info!(
                    "populating cuckoo filter: {}/{} (failed to insert: {})",
                    report.attempted,
                    expected,
                    report.failed
                );
            }
        }

        if report.failed > 0 {
            log::warn!(
                "{} of {} spent addresses could not be inserted into the cuckoo filter",
                report.failed,
                report.attempted
            );
        }
        report.size_bytes = filter.memory_usage();
        Ok((filter, report))
    }

    /// Insert one address; false if the filter had no room left for it
    pub fn insert(&mut self, address: &Hash) -> bool {
        self.filter.add(address.as_bytes()).is_ok()
    }

    pub fn contains(&self, address: &Hash) -> bool {
        self.filter.contains(address.as_bytes())
    }

    /// Number of elements the filter reports holding
    pub fn len(&self) -> usize {
        self.filter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.filter.memory_usage()
    }

    /// Serialize to an opaque byte image
    pub fn to_image(&self) -> Vec<u8> {
        let exported = self.filter.export();
        let mut image = Vec::with_capacity(IMAGE_HEADER_BYTES + exported.values.len());
        image.extend_from_slice(&(exported.length as u64).to_le_bytes());
        image.extend_from_slice(&(exported.values.len() as u64).to_le_bytes());
        image.extend_from_slice(&exported.values);
        image
    }

    /// Rebuild from an image produced by [`Self::to_image`]
    pub fn from_image(image: &[u8]) -> std::result::Result<Self, IntegrityError> {
        let corrupt = |reason: String| IntegrityError::CorruptFilter(reason);

        let mut header = image;
        let length = header
            .read_u64::<LittleEndian>()
            .map_err(|_| corrupt(format!("image of {} bytes has no header", image.len())))?;
        let values_len = header
            .read_u64::<LittleEndian>()
            .map_err(|_| corrupt(format!("image of {} bytes has no header", image.len())))?;
        let values = header;

        if values.len() as u64 != values_len {
            return Err(corrupt(format!(
                "image declares {} fingerprint bytes but holds {}",
                values_len,
                values.len()
            )));
        }
        let buckets = values.len() / BUCKET_BYTES;
        if values.is_empty() || values.len() % BUCKET_BYTES != 0 || !buckets.is_power_of_two() {
            return Err(corrupt(format!(
                "{} fingerprint bytes is not a power-of-two number of buckets",
                values.len()
            )));
        }
        if length > values.len() as u64 {
            return Err(corrupt(format!(
                "{} elements cannot fit in {} fingerprint slots",
                length,
                values.len()
            )));
        }

        let exported = ExportedCuckooFilter {
            values: values.to_vec(),
            length: length as usize,
        };
        Ok(Self {
            filter: CuckooFilter::from(exported),
        })
    }

    /// The element count must equal the count declared alongside the image
    pub fn validate_count(&self, declared: usize) -> std::result::Result<(), IntegrityError> {
        if self.len() != declared {
            return Err(IntegrityError::FilterCount {
                filter: self.len(),
                header: declared,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SpentAddressFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpentAddressFilter")
            .field("len", &self.len())
            .field("memory_usage", &self.memory_usage())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HASH_BYTES;
    use rand::{Rng, SeedableRng};

    fn random_addresses(n: usize, seed: u64) -> Vec<Hash> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut raw = [0u8; HASH_BYTES];
                rng.fill(&mut raw[..]);
                Hash::from_bytes(raw)
            })
            .collect()
    }

    #[test]
    fn test_no_false_negatives() {
        let addresses = random_addresses(1_000, 1);
        let (filter, report) =
            SpentAddressFilter::build(4_096, addresses.len(), addresses.iter().copied().map(Ok))
                .unwrap();

        assert_eq!(report.attempted, 1_000);
        assert_eq!(report.failed, 0);
        assert_eq!(filter.len(), 1_000);
        for address in &addresses {
            assert!(filter.contains(address));
        }
    }

    #[test]
    fn test_capacity_checked_before_insertion() {
        let addresses = random_addresses(10, 2);
        let mut consumed = 0;
        let iter = addresses.iter().copied().map(|a| {
            consumed += 1;
            Ok(a)
        });
        let err = SpentAddressFilter::build(5, 10, iter).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("spent addresses 10 vs. CF capacity 5"));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_image_round_trip() {
        let addresses = random_addresses(500, 3);
        let (filter, _) =
            SpentAddressFilter::build(1_024, 500, addresses.iter().copied().map(Ok)).unwrap();

        let image = filter.to_image();
        let restored = SpentAddressFilter::from_image(&image).unwrap();
        assert_eq!(restored.len(), filter.len());
        restored.validate_count(filter.len()).unwrap();
        for address in &addresses {
            assert!(restored.contains(address));
        }
    }

    #[test]
    fn test_image_header_layout() {
        let (filter, _) =
            SpentAddressFilter::build(64, 3, random_addresses(3, 5).into_iter().map(Ok)).unwrap();
        let image = filter.to_image();

        let values = image.len() - IMAGE_HEADER_BYTES;
        assert_eq!(&image[..8], &(filter.len() as u64).to_le_bytes());
        assert_eq!(&image[8..16], &(values as u64).to_le_bytes());
    }

    #[test]
    fn test_corrupt_images_rejected() {
        let (filter, _) = SpentAddressFilter::build(64, 0, std::iter::empty()).unwrap();
        let image = filter.to_image();

        assert!(SpentAddressFilter::from_image(&image[..10]).is_err());
        assert!(SpentAddressFilter::from_image(&image[..image.len() - 1]).is_err());

        let mut inflated = image.clone();
        inflated[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            SpentAddressFilter::from_image(&inflated),
            Err(IntegrityError::CorruptFilter(_))
        ));
    }

    #[test]
    fn test_count_validation() {
        let (filter, _) = SpentAddressFilter::build(
            64,
            3,
            random_addresses(3, 4).into_iter().map(Ok),
        )
        .unwrap();
        assert!(filter.validate_count(3).is_ok());
        assert_eq!(
            filter.validate_count(4),
            Err(IntegrityError::FilterCount {
                filter: 3,
                header: 4
            })
        );
    }
}
