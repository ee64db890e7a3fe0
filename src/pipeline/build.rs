//! Local snapshot database construction
//!
//! Copies the spent addresses of a node's spent-addresses database into the
//! local snapshot database, then parses the plaintext meta/state files and
//! stores their binary encoding.

use crate::codec::{encode_store, LOCAL_SNAPSHOT_KEY};
use crate::config::{IngestConfig, SnapshotFiles};
use crate::core::SnapshotState;
use crate::error::Result;
use crate::pipeline::summary::SnapshotSummary;
use crate::storage::{ingest_spent_addresses, IngestReport, KeyValueStore, Partition};
use serde::Serialize;

/// Outcome of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub ingest: IngestReport,
    pub snapshot: SnapshotSummary,
}

/// Fills a local snapshot store
pub struct SnapshotBuilder<'a> {
    target: &'a dyn KeyValueStore,
    ingest: IngestConfig,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(target: &'a dyn KeyValueStore, ingest: IngestConfig) -> Self {
        Self { target, ingest }
    }

    /// Ingest spent addresses, then persist the snapshot
    pub fn build(&self, spent_addresses: &dyn KeyValueStore, files: &SnapshotFiles) -> Result<BuildReport> {
        let ingest = ingest_spent_addresses(spent_addresses, self.target, &self.ingest)?;
        let snapshot = SnapshotState::from_files(&files.meta, &files.state)?;
        let summary = self.persist(&snapshot)?;
        Ok(BuildReport {
            ingest,
            snapshot: summary,
        })
    }

    /// Store the binary encoding of `snapshot`
    pub fn persist(&self, snapshot: &SnapshotState) -> Result<SnapshotSummary> {
        let summary = SnapshotSummary::new(snapshot);
        log::info!(
            "milestone {} ({}), {} solid entry points, {} seen milestones, {} ledger entries",
            summary.milestone_index,
            summary.milestone_hash,
            summary.solid_entry_points,
            summary.seen_milestones,
            summary.ledger_entries
        );
        if !summary.supply.correct {
            log::warn!(
                "ledger supply {} does not match expected {}",
                summary.supply.computed,
                summary.supply.expected
            );
        }

        let blob = encode_store(snapshot)?;
        self.target
            .put(Partition::LocalSnapshots, &LOCAL_SNAPSHOT_KEY, &blob)?;
        log::info!("persisted {} byte snapshot", blob.len());
        Ok(summary)
    }
}
