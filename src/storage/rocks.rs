//! RocksDB-backed store
//!
//! One column family per [`Partition`]. Missing databases and column
//! families are created on open.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::storage::kv::{KeyValueStore, KvIter, Partition};
use rocksdb::{BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::path::{Path, PathBuf};

const CURRENT_FILE: &str = "CURRENT";

pub struct RocksStore {
    db: DB,
    path: PathBuf,
}

fn options(config: &StoreConfig, cache: &Cache) -> Options {
    let mut table = BlockBasedOptions::default();
    table.set_bloom_filter(config.bloom_filter_bits_per_key, false);
    table.set_block_restart_interval(config.block_restart_interval);
    table.set_block_cache(cache);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&table);
    opts.set_max_open_files(config.max_open_files);
    opts.set_max_background_jobs(config.max_background_jobs);
    opts.set_table_cache_num_shard_bits(config.table_cache_num_shard_bits);
    opts.set_max_log_file_size(config.max_log_file_size);
    opts.set_max_manifest_file_size(config.max_manifest_file_size);
    opts
}

impl RocksStore {
    /// Open (or create) the database at `path` with the given partitions
    pub fn open(path: &Path, partitions: &[Partition], config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;

        let cache = Cache::new_lru_cache(config.block_cache_size);
        let mut db_opts = options(config, &cache);
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // every existing column family has to be opened too; only a database
        // without a CURRENT file counts as new
        let mut names: Vec<String> = if path.join(CURRENT_FILE).exists() {
            DB::list_cf(&db_opts, path)?
        } else {
            Vec::new()
        };
        for partition in partitions {
            if !names.iter().any(|n| n == partition.name()) {
                names.push(partition.name().to_string());
            }
        }
        let cfs = names
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, options(config, &cache)));
        let db = DB::open_cf_descriptors(&db_opts, path, cfs)?;

        log::debug!("opened {} with {} partitions", path.display(), partitions.len());
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf(&self, partition: Partition) -> Result<&ColumnFamily> {
        self.db.cf_handle(partition.name()).ok_or_else(|| {
            Error::Store(format!(
                "column family {} missing in {}",
                partition,
                self.path.display()
            ))
        })
    }
}

impl KeyValueStore for RocksStore {
    fn put(&self, partition: Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf(partition)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    fn get(&self, partition: Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(partition)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn iter(&self, partition: Partition) -> Result<KvIter<'_>> {
        let cf = self.cf(partition)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::Start).map(|item| {
            item.map(|(k, v)| (k.into_vec(), v.into_vec()))
                .map_err(Error::from)
        });
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_across_reopen() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::default();
        {
            let store = RocksStore::open(dir.path(), &Partition::LOCAL_SNAPSHOTS_DB, &config).unwrap();
            store.put(Partition::SpentAddresses, b"b", b"").unwrap();
            store.put(Partition::SpentAddresses, b"a", b"").unwrap();
            store.put(Partition::LocalSnapshots, &[0, 0, 0, 1], b"blob").unwrap();
        }

        let store = RocksStore::open(dir.path(), &Partition::LOCAL_SNAPSHOTS_DB, &config).unwrap();
        let keys: Vec<Vec<u8>> = store
            .iter(Partition::SpentAddresses)
            .unwrap()
            .map(|pair| pair.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(store.count(Partition::SpentAddresses).unwrap(), 2);
        assert_eq!(
            store.get(Partition::LocalSnapshots, &[0, 0, 0, 1]).unwrap(),
            Some(b"blob".to_vec())
        );
        assert_eq!(store.get(Partition::Default, b"none").unwrap(), None);
    }

    #[test]
    fn test_reopen_with_fewer_partitions() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::default();
        {
            let store = RocksStore::open(dir.path(), &Partition::LOCAL_SNAPSHOTS_DB, &config).unwrap();
            store.put(Partition::SpentAddresses, b"a", b"").unwrap();
        }

        // a local snapshot database also serves as a spent-addresses source
        let store = RocksStore::open(dir.path(), &Partition::SPENT_ADDRESSES_DB, &config).unwrap();
        assert_eq!(store.count(Partition::SpentAddresses).unwrap(), 1);
    }

    #[test]
    fn test_corrupt_database_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CURRENT_FILE), b"MANIFEST-999999\n").unwrap();

        let err = RocksStore::open(dir.path(), &Partition::SPENT_ADDRESSES_DB, &StoreConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_unopened_partition() {
        let dir = TempDir::new().unwrap();
        let store =
            RocksStore::open(dir.path(), &Partition::SPENT_ADDRESSES_DB, &StoreConfig::default()).unwrap();
        let err = store.put(Partition::LocalSnapshots, b"k", b"v").unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
