//! Export, inspection and import of interchange files
//!
//! Export reads the snapshot and the spent addresses out of a local snapshot
//! store, encodes them in the configured format and moves the finished file
//! into place only once it is complete. Inspection decodes and verifies a
//! file without touching any store. Import writes a verified file back into
//! a store.

use crate::codec::{
    decode_export, decode_store, encode_export, encode_store, ExportFile, FormatVersion,
    SpentAddresses, SpentPayload, LOCAL_SNAPSHOT_KEY,
};
use crate::config::ExportConfig;
use crate::core::{Hash, SnapshotState};
use crate::error::{ConfigurationError, Error, Result};
use crate::filter::{FilterBuildReport, SpentAddressFilter};
use crate::pipeline::summary::ExportSummary;
use crate::storage::{KeyValueStore, Partition, SPENT_ADDRESS_VALUE};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub file: PathBuf,
    pub version: FormatVersion,
    pub spent_addresses: usize,
    /// Present for the gzipped format unless spent addresses were omitted
    pub filter: Option<FilterBuildReport>,
    pub file_size: u64,
}

/// Outcome of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub summary: ExportSummary,
    pub restored_spent_addresses: usize,
    /// Addresses held only as filter fingerprints
    pub unrestorable_spent_addresses: usize,
}

/// Moves snapshots between a store and export files
pub struct ExportPipeline<'a> {
    store: &'a dyn KeyValueStore,
    config: ExportConfig,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(store: &'a dyn KeyValueStore, config: ExportConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Snapshot held by the store (first entry of the snapshot partition)
    pub fn read_snapshot(&self) -> Result<SnapshotState> {
        let (_, blob) = self
            .store
            .first(Partition::LocalSnapshots)?
            .ok_or_else(|| ConfigurationError::NoSnapshot(self.config.ls_db_dir.clone()))?;
        decode_store(&blob)
    }

    /// Write the configured export file
    pub fn export(&self) -> Result<ExportReport> {
        let snapshot = self.read_snapshot()?;
        let version = self.config.format;
        let path = &self.config.file;
        log::info!(
            "exporting milestone {} as {} to {}",
            snapshot.milestone_index(),
            version,
            path.display()
        );

        let spent_count = if self.config.omit_spent_addresses {
            log::info!("omitting spent addresses");
            0
        } else {
            self.store.count(Partition::SpentAddresses)?
        };

        let mut filter_report = None;
        let staged = staged_path(path);
        let written = write_staged(&staged, |writer| {
            if self.config.omit_spent_addresses {
                return encode_export(writer, version, &snapshot, SpentPayload::Omitted);
            }
            match version {
                FormatVersion::Gzipped => {
                    let (filter, report) = SpentAddressFilter::build(
                        self.config.filter_capacity,
                        spent_count,
                        self.spent_addresses()?,
                    )?;
                    if report.failed > 0 {
                        log::warn!("{} spent addresses did not fit the filter", report.failed);
                    }
                    filter_report = Some(report);
                    encode_export(writer, version, &snapshot, SpentPayload::Filter(&filter))
                }
                FormatVersion::Checksummed => {
                    let payload = SpentPayload::List {
                        count: spent_count,
                        addresses: self.spent_addresses()?,
                    };
                    encode_export(writer, version, &snapshot, payload)
                }
            }
        });
        if let Err(e) = written {
            remove_if_present(&staged)?;
            return Err(e);
        }

        remove_if_present(path)?;
        fs::rename(&staged, path).map_err(|e| Error::io(path, e))?;
        let file_size = fs::metadata(path).map_err(|e| Error::io(path, e))?.len();

        let spent_addresses = filter_report.as_ref().map_or(spent_count, |r| r.inserted);
        log::info!("wrote {} bytes to {}", file_size, path.display());
        Ok(ExportReport {
            file: path.clone(),
            version,
            spent_addresses,
            filter: filter_report,
            file_size,
        })
    }

    /// Write a verified export file into the store
    ///
    /// Filter-backed files only restore the snapshot; their addresses cannot
    /// be enumerated.
    pub fn import(&self, path: &Path) -> Result<ImportReport> {
        let (file, file_size) = read_export(path)?;
        let summary = ExportSummary::new(&file, file_size);

        self.store.put(
            Partition::LocalSnapshots,
            &LOCAL_SNAPSHOT_KEY,
            &encode_store(&file.snapshot)?,
        )?;

        let mut restored = 0;
        let mut unrestorable = 0;
        match &file.spent_addresses {
            SpentAddresses::List(list) => {
                for address in list {
                    self.store
                        .put(Partition::SpentAddresses, address.as_bytes(), SPENT_ADDRESS_VALUE)?;
                    restored += 1;
                }
            }
            SpentAddresses::Filter(filter) => {
                unrestorable = filter.len();
                log::warn!(
                    "{} spent addresses are only held in a cuckoo filter and cannot be restored",
                    unrestorable
                );
            }
            SpentAddresses::Omitted => {}
        }

        log::info!(
            "imported milestone {} with {} spent addresses",
            file.snapshot.milestone_index(),
            restored
        );
        Ok(ImportReport {
            summary,
            restored_spent_addresses: restored,
            unrestorable_spent_addresses: unrestorable,
        })
    }

    fn spent_addresses(&self) -> Result<Box<dyn Iterator<Item = Result<Hash>> + 'a>> {
        let iter = self.store.iter(Partition::SpentAddresses)?;
        Ok(Box::new(iter.map(|pair| -> Result<Hash> {
            let (key, _) = pair?;
            Ok(Hash::from_slice(&key)?)
        })))
    }
}

/// Decode and verify an export file
pub fn read_export(path: &Path) -> Result<(ExportFile, u64)> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let file = decode_export(&bytes)?;
    Ok((file, bytes.len() as u64))
}

/// Summary of a verified export file
pub fn inspect(path: &Path) -> Result<ExportSummary> {
    let (file, file_size) = read_export(path)?;
    Ok(ExportSummary::new(&file, file_size))
}

fn staged_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_staged<F>(staged: &Path, encode: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<BufWriter<File>>,
{
    let file = File::create(staged).map_err(|e| Error::io(staged, e))?;
    let mut writer = encode(BufWriter::new(file))?;
    writer.flush().map_err(|e| Error::io(staged, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::io(staged, e.into_error()))?;
    file.sync_all().map_err(|e| Error::io(staged, e))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
