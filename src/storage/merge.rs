//! Spent address merging
//!
//! Folds several address sources into one target store. Addresses are
//! deduplicated across the whole run by the SHA-256 digest of their binary
//! form, so the target ends up holding the union no matter the source order.
//!
//! Sources are either spent-addresses databases or `.txt` files with one
//! address per line (81 trytes, or 90 with a checksum that gets dropped).

use crate::config::IngestConfig;
use crate::core::Hash;
use crate::crypto::{sha256, DIGEST_BYTES};
use crate::error::{ConfigurationError, Error, FormatError, Result};
use crate::storage::ingest::stream_keys;
use crate::storage::kv::{KeyValueStore, Partition, SPENT_ADDRESS_VALUE};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Fewest sources a merge accepts
pub const MIN_MERGE_SOURCES: usize = 2;

/// Where a batch of spent addresses comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource {
    /// A spent-addresses database directory
    Store(PathBuf),
    /// Newline-delimited trytes
    TextFile(PathBuf),
}

impl MergeSource {
    /// Classify a path by its extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|e| e.to_str()) {
            Some("txt") => MergeSource::TextFile(path),
            _ => MergeSource::Store(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            MergeSource::Store(p) | MergeSource::TextFile(p) => p,
        }
    }
}

/// Opens the database behind a [`MergeSource::Store`]
pub trait StoreOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn KeyValueStore>>;
}

impl<F> StoreOpener for F
where
    F: Fn(&Path) -> Result<Box<dyn KeyValueStore>>,
{
    fn open(&self, path: &Path) -> Result<Box<dyn KeyValueStore>> {
        self(path)
    }
}

/// Counters of one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub read: usize,
    pub added: usize,
    pub known: usize,
}

/// Counters of a whole merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub sources: Vec<SourceReport>,
    pub total_added: usize,
    pub total_known: usize,
}

/// Deduplicating writer into a target store
pub struct SpentAddressMerger<'a> {
    target: &'a dyn KeyValueStore,
    ingest: IngestConfig,
    seen: HashSet<[u8; DIGEST_BYTES]>,
    report: MergeReport,
}

impl<'a> SpentAddressMerger<'a> {
    pub fn new(target: &'a dyn KeyValueStore, ingest: IngestConfig) -> Self {
        Self {
            target,
            ingest,
            seen: HashSet::new(),
            report: MergeReport::default(),
        }
    }

    /// Merge every key of a source database's spent-addresses partition
    pub fn merge_store(&mut self, name: &str, source: &dyn KeyValueStore) -> Result<&SourceReport> {
        log::info!("merging {}", name);
        let mut counters = SourceReport {
            source: name.to_string(),
            ..SourceReport::default()
        };
        let ingest = self.ingest.clone();
        stream_keys(source, Partition::SpentAddresses, &ingest, |key| {
            let address = Hash::from_slice(&key)?;
            self.offer(&address, &mut counters)
        })?;
        Ok(self.close_source(counters))
    }

    /// Merge newline-delimited trytes; blank lines are skipped
    pub fn merge_text<R: BufRead>(&mut self, name: &str, reader: R) -> Result<&SourceReport> {
        log::info!("merging {}", name);
        let mut counters = SourceReport {
            source: name.to_string(),
            ..SourceReport::default()
        };
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let address = Hash::from_trytes(text).map_err(|e| FormatError::Line {
                source_name: name.to_string(),
                line: index + 1,
                reason: e.to_string(),
            })?;
            self.offer(&address, &mut counters)?;
        }
        Ok(self.close_source(counters))
    }

    fn offer(&mut self, address: &Hash, counters: &mut SourceReport) -> Result<()> {
        counters.read += 1;
        if !self.seen.insert(sha256(address.as_bytes())) {
            counters.known += 1;
            return Ok(());
        }
        self.target
            .put(Partition::SpentAddresses, address.as_bytes(), SPENT_ADDRESS_VALUE)?;
        counters.added += 1;
        Ok(())
    }

    fn close_source(&mut self, counters: SourceReport) -> &SourceReport {
        log::info!(
            "{}: new {}, known {}",
            counters.source,
            counters.added,
            counters.known
        );
        self.report.total_added += counters.added;
        self.report.total_known += counters.known;
        self.report.sources.push(counters);
        // just pushed
        &self.report.sources[self.report.sources.len() - 1]
    }

    pub fn finish(self) -> MergeReport {
        log::info!(
            "merge done: {} new, {} known",
            self.report.total_added,
            self.report.total_known
        );
        self.report
    }
}

/// Merge all `sources` into `target`
pub fn merge_sources(
    sources: &[MergeSource],
    target: &dyn KeyValueStore,
    opener: &dyn StoreOpener,
    ingest: &IngestConfig,
) -> Result<MergeReport> {
    if sources.len() < MIN_MERGE_SOURCES {
        return Err(ConfigurationError::TooFewSources {
            min: MIN_MERGE_SOURCES,
            got: sources.len(),
        }
        .into());
    }

    let mut merger = SpentAddressMerger::new(target, ingest.clone());
    for source in sources {
        let path = source.path();
        let name = path.display().to_string();
        match source {
            MergeSource::Store(_) => {
                let store = opener.open(path)?;
                merger.merge_store(&name, store.as_ref())?;
            }
            MergeSource::TextFile(_) => {
                let file = File::open(path).map_err(|e| Error::io(path, e))?;
                merger.merge_text(&name, BufReader::new(file))?;
            }
        }
    }
    Ok(merger.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::Rng;
    use std::io::Cursor;

    fn no_stores(path: &Path) -> Result<Box<dyn KeyValueStore>> {
        Err(Error::Store(format!("unexpected store {}", path.display())))
    }

    fn addr(text: &str) -> Hash {
        Hash::from_trytes(text).unwrap()
    }

    fn target() -> MemoryStore {
        MemoryStore::new(&Partition::SPENT_ADDRESSES_DB)
    }

    fn random_trytes(rng: &mut impl Rng) -> String {
        const ALPHABET: &[u8] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        (0..81)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }

    #[test]
    fn test_two_text_sources() {
        let dest = target();
        let mut merger = SpentAddressMerger::new(&dest, IngestConfig::default());

        let first = merger
            .merge_text("a.txt", Cursor::new("ADDRESSONE\nADDRESSTWO\n"))
            .unwrap()
            .clone();
        assert_eq!((first.added, first.known, first.read), (2, 0, 2));

        let second = merger
            .merge_text("b.txt", Cursor::new("ADDRESSTWO\nADDRESSTHREE\n"))
            .unwrap()
            .clone();
        assert_eq!((second.added, second.known, second.read), (1, 1, 2));

        let report = merger.finish();
        assert_eq!(report.total_added, 3);
        assert_eq!(report.total_known, 1);

        let mut expected: Vec<Vec<u8>> = ["ADDRESSONE", "ADDRESSTWO", "ADDRESSTHREE"]
            .iter()
            .map(|a| addr(a).as_bytes().to_vec())
            .collect();
        expected.sort();
        assert_eq!(dest.keys(Partition::SpentAddresses).unwrap(), expected);
    }

    #[test]
    fn test_checksum_suffix_dropped() {
        let dest = target();
        let mut merger = SpentAddressMerger::new(&dest, IngestConfig::default());
        let plain = "A".repeat(81);
        let with_checksum = format!("{}{}", plain, "CHECKSUMX");
        let report = merger
            .merge_text("c.txt", Cursor::new(format!("{}\n{}\n", plain, with_checksum)))
            .unwrap();
        assert_eq!((report.added, report.known), (1, 1));
    }

    #[test]
    fn test_malformed_line_aborts() {
        let dest = target();
        let mut merger = SpentAddressMerger::new(&dest, IngestConfig::default());
        let err = merger
            .merge_text("bad.txt", Cursor::new("ADDRESSONE\n\nnot-trytes\n"))
            .unwrap_err();
        match err {
            Error::Format(FormatError::Line { source_name, line, .. }) => {
                assert_eq!(source_name, "bad.txt");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_store_sources_and_order_independence() {
        let mut rng = rand::thread_rng();
        let pool: Vec<Hash> = (0..200).map(|_| addr(&random_trytes(&mut rng))).collect();

        let left = target();
        let right = target();
        for a in &pool[..120] {
            left.put(Partition::SpentAddresses, a.as_bytes(), SPENT_ADDRESS_VALUE).unwrap();
        }
        for a in &pool[80..] {
            right.put(Partition::SpentAddresses, a.as_bytes(), SPENT_ADDRESS_VALUE).unwrap();
        }

        let forward = target();
        let mut merger = SpentAddressMerger::new(&forward, IngestConfig::default());
        merger.merge_store("left", &left).unwrap();
        merger.merge_store("right", &right).unwrap();
        let report = merger.finish();
        assert_eq!(report.total_added, 200);
        assert_eq!(report.total_known, 40);

        let backward = target();
        let mut merger = SpentAddressMerger::new(&backward, IngestConfig::default());
        merger.merge_store("right", &right).unwrap();
        merger.merge_store("left", &left).unwrap();
        merger.finish();

        assert_eq!(
            forward.keys(Partition::SpentAddresses).unwrap(),
            backward.keys(Partition::SpentAddresses).unwrap()
        );
    }

    #[test]
    fn test_disjoint_sources_add_up() {
        let mut rng = rand::thread_rng();
        let left = target();
        let right = target();
        // distinct leading trytes keep the two sets apart
        for _ in 0..70 {
            let a = addr(&format!("A{}", &random_trytes(&mut rng)[1..]));
            left.put(Partition::SpentAddresses, a.as_bytes(), SPENT_ADDRESS_VALUE).unwrap();
        }
        for _ in 0..30 {
            let a = addr(&format!("9{}", &random_trytes(&mut rng)[1..]));
            right.put(Partition::SpentAddresses, a.as_bytes(), SPENT_ADDRESS_VALUE).unwrap();
        }
        let m = left.count(Partition::SpentAddresses).unwrap();
        let n = right.count(Partition::SpentAddresses).unwrap();
        let left_keys = left.keys(Partition::SpentAddresses).unwrap();
        let overlap = right
            .keys(Partition::SpentAddresses)
            .unwrap()
            .into_iter()
            .filter(|k| left_keys.contains(k))
            .count();
        assert_eq!(overlap, 0);

        let dest = target();
        let mut merger = SpentAddressMerger::new(&dest, IngestConfig::default());
        merger.merge_store("left", &left).unwrap();
        merger.merge_store("right", &right).unwrap();
        let report = merger.finish();

        assert_eq!(report.total_added, m + n);
        assert_eq!(report.total_known, 0);
        assert_eq!(dest.count(Partition::SpentAddresses).unwrap(), m + n);
    }

    #[test]
    fn test_target_write_failure_aborts() {
        // no spent-addresses partition to write into
        let broken = MemoryStore::new(&[Partition::Default]);

        let mut merger = SpentAddressMerger::new(&broken, IngestConfig::default());
        let err = merger
            .merge_text("a.txt", Cursor::new("ADDRESSONE\nADDRESSTWO\n"))
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        let source = target();
        source
            .put(Partition::SpentAddresses, addr("ADDRESSONE").as_bytes(), SPENT_ADDRESS_VALUE)
            .unwrap();
        let mut merger = SpentAddressMerger::new(&broken, IngestConfig::default());
        let err = merger.merge_store("db", &source).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_full_overlap_is_idempotent() {
        let source = target();
        for name in ["ADDRESSONE", "ADDRESSTWO", "ADDRESSTHREE"] {
            source
                .put(Partition::SpentAddresses, addr(name).as_bytes(), SPENT_ADDRESS_VALUE)
                .unwrap();
        }

        let dest = target();
        let mut merger = SpentAddressMerger::new(&dest, IngestConfig::default());
        merger.merge_store("once", &source).unwrap();
        let again = merger.merge_store("twice", &source).unwrap().clone();
        assert_eq!((again.added, again.known), (0, 3));
        assert_eq!(dest.count(Partition::SpentAddresses).unwrap(), 3);
    }

    #[test]
    fn test_too_few_sources() {
        let dest = target();
        let err = merge_sources(
            &[MergeSource::from_path("only.txt")],
            &dest,
            &no_stores,
            &IngestConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_merge_sources_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "ADDRESSONE\nADDRESSTWO\n").unwrap();
        std::fs::write(&b, "ADDRESSTWO\nADDRESSTHREE\n").unwrap();

        let dest = target();
        let sources = [MergeSource::from_path(&a), MergeSource::from_path(&b)];
        let report = merge_sources(&sources, &dest, &no_stores, &IngestConfig::default()).unwrap();
        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.total_added, 3);
        assert_eq!(report.total_known, 1);
    }

    #[test]
    fn test_source_classification() {
        assert!(matches!(MergeSource::from_path("x/list.txt"), MergeSource::TextFile(_)));
        assert!(matches!(MergeSource::from_path("x/spent-db"), MergeSource::Store(_)));
    }
}
