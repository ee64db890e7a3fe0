//! End-to-end operations
//!
//! This module contains:
//! - Building the local snapshot database from a node's files
//! - Exporting, inspecting and importing interchange files
//! - Printable summaries for both

pub mod build;
pub mod export;
pub mod summary;

pub use build::{BuildReport, SnapshotBuilder};
pub use export::{inspect, read_export, ExportPipeline, ExportReport, ImportReport};
pub use summary::{ExportSummary, SnapshotSummary, SpentRepresentation};
