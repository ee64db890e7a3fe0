//! In-memory store
//!
//! Same contract as the on-disk store; used for dry runs and tests.

use crate::error::{Error, Result};
use crate::storage::kv::{KeyValueStore, KvIter, KvPair, Partition};
use std::collections::BTreeMap;
use std::sync::RwLock;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<BTreeMap<Partition, Table>>,
}

impl MemoryStore {
    /// Store with the given partitions opened
    pub fn new(partitions: &[Partition]) -> Self {
        let tables = partitions.iter().map(|p| (*p, Table::new())).collect();
        Self {
            partitions: RwLock::new(tables),
        }
    }

    /// Keys of a partition, for assertions
    pub fn keys(&self, partition: Partition) -> Result<Vec<Vec<u8>>> {
        self.iter(partition)?.map(|pair| pair.map(|(k, _)| k)).collect()
    }
}

fn missing(partition: Partition) -> Error {
    Error::Store(format!("partition {} is not open", partition))
}

fn poisoned() -> Error {
    Error::Store("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn put(&self, partition: Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let mut tables = self.partitions.write().map_err(|_| poisoned())?;
        let table = tables.get_mut(&partition).ok_or_else(|| missing(partition))?;
        table.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, partition: Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.partitions.read().map_err(|_| poisoned())?;
        let table = tables.get(&partition).ok_or_else(|| missing(partition))?;
        Ok(table.get(key).cloned())
    }

    fn iter(&self, partition: Partition) -> Result<KvIter<'_>> {
        let tables = self.partitions.read().map_err(|_| poisoned())?;
        let table = tables.get(&partition).ok_or_else(|| missing(partition))?;
        // copy so writers are not blocked while the caller iterates
        let pairs: Vec<KvPair> = table.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Ok(Box::new(pairs.into_iter().map(Ok)))
    }

    fn count(&self, partition: Partition) -> Result<usize> {
        let tables = self.partitions.read().map_err(|_| poisoned())?;
        Ok(tables.get(&partition).ok_or_else(|| missing(partition))?.len())
    }
}
