//! Key-value store abstraction
//!
//! The tool only needs put, get and ordered full-range iteration over a
//! handful of named partitions (column families).

use crate::error::Result;
use std::fmt;

/// A key and its value, owned by the caller
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered iteration over one partition
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

/// Value stored alongside every spent address key
pub const SPENT_ADDRESS_VALUE: &[u8] = &[];

/// Logical partition of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Default,
    SpentAddresses,
    LocalSnapshots,
}

impl Partition {
    /// Partitions of a spent-addresses database
    pub const SPENT_ADDRESSES_DB: [Partition; 2] = [Partition::Default, Partition::SpentAddresses];

    /// Partitions of a local snapshot database
    pub const LOCAL_SNAPSHOTS_DB: [Partition; 3] = [
        Partition::Default,
        Partition::SpentAddresses,
        Partition::LocalSnapshots,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Partition::Default => "default",
            Partition::SpentAddresses => "spent-addresses",
            Partition::LocalSnapshots => "localsnapshots",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered key-value store
///
/// Writes must be safe to issue while another thread iterates.
pub trait KeyValueStore: Send + Sync {
    fn put(&self, partition: Partition, key: &[u8], value: &[u8]) -> Result<()>;

    fn get(&self, partition: Partition, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Every pair of the partition in key order; each call starts over
    fn iter(&self, partition: Partition) -> Result<KvIter<'_>>;

    /// First pair in key order
    fn first(&self, partition: Partition) -> Result<Option<KvPair>> {
        self.iter(partition)?.next().transpose()
    }

    fn count(&self, partition: Partition) -> Result<usize> {
        let mut count = 0;
        for pair in self.iter(partition)? {
            pair?;
            count += 1;
        }
        Ok(count)
    }
}
