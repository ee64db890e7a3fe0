//! Printable summaries of snapshots and export files

use crate::codec::{ExportFile, FormatVersion, SpentAddresses};
use crate::core::{SnapshotState, SupplyCheck};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Headline numbers of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub milestone_hash: String,
    pub milestone_index: i32,
    pub milestone_timestamp: i64,
    /// RFC 3339 rendering of the timestamp, when representable
    pub milestone_time: Option<String>,
    pub solid_entry_points: usize,
    pub seen_milestones: usize,
    pub ledger_entries: usize,
    pub supply: SupplyCheck,
    pub size_bytes: usize,
}

impl SnapshotSummary {
    pub fn new(snapshot: &SnapshotState) -> Self {
        let milestone_time = DateTime::<Utc>::from_timestamp(snapshot.milestone_timestamp(), 0)
            .map(|t| t.to_rfc3339());
        Self {
            milestone_hash: snapshot.milestone_hash().to_string(),
            milestone_index: snapshot.milestone_index(),
            milestone_timestamp: snapshot.milestone_timestamp(),
            milestone_time,
            solid_entry_points: snapshot.solid_entry_points().len(),
            seen_milestones: snapshot.seen_milestones().len(),
            ledger_entries: snapshot.ledger_state().len(),
            supply: snapshot.supply_check(),
            size_bytes: snapshot.size_in_bytes(),
        }
    }
}

impl fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Milestone hash:      {}", self.milestone_hash)?;
        writeln!(f, "  Milestone index:     {}", self.milestone_index)?;
        match &self.milestone_time {
            Some(time) => writeln!(
                f,
                "  Milestone timestamp: {} ({})",
                self.milestone_timestamp, time
            )?,
            None => writeln!(f, "  Milestone timestamp: {}", self.milestone_timestamp)?,
        }
        writeln!(f, "  Solid entry points:  {}", self.solid_entry_points)?;
        writeln!(f, "  Seen milestones:     {}", self.seen_milestones)?;
        writeln!(f, "  Ledger entries:      {}", self.ledger_entries)?;
        writeln!(
            f,
            "  Supply:              {} (expected {}, {})",
            self.supply.computed,
            self.supply.expected,
            if self.supply.correct { "correct" } else { "MISMATCH" }
        )?;
        write!(f, "  Snapshot size:       {} bytes", self.size_bytes)
    }
}

/// How an export file carries spent addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpentRepresentation {
    CuckooFilter,
    List,
    Omitted,
}

impl fmt::Display for SpentRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SpentRepresentation::CuckooFilter => "cuckoo filter",
            SpentRepresentation::List => "list",
            SpentRepresentation::Omitted => "omitted",
        };
        f.write_str(text)
    }
}

/// Everything `export-info` reports about a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub version: FormatVersion,
    pub version_byte: u8,
    pub snapshot: SnapshotSummary,
    pub spent_addresses: usize,
    pub spent_representation: SpentRepresentation,
    pub filter_bytes: usize,
    pub file_size: u64,
}

impl ExportSummary {
    pub fn new(file: &ExportFile, file_size: u64) -> Self {
        let spent_representation = match file.spent_addresses {
            SpentAddresses::Filter(_) => SpentRepresentation::CuckooFilter,
            SpentAddresses::List(_) => SpentRepresentation::List,
            SpentAddresses::Omitted => SpentRepresentation::Omitted,
        };
        Self {
            version: file.version,
            version_byte: file.version.byte(),
            snapshot: SnapshotSummary::new(&file.snapshot),
            spent_addresses: file.spent_addresses.len(),
            spent_representation,
            filter_bytes: file.filter_bytes,
            file_size,
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Format:              {} (version {})", self.version, self.version_byte)?;
        writeln!(f, "{}", self.snapshot)?;
        writeln!(
            f,
            "  Spent addresses:     {} ({})",
            self.spent_addresses, self.spent_representation
        )?;
        if self.spent_representation == SpentRepresentation::CuckooFilter {
            writeln!(f, "  Filter size:         {} bytes", self.filter_bytes)?;
        }
        write!(f, "  File size:           {} bytes", self.file_size)
    }
}
