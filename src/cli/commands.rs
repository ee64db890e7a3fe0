//! CLI command handlers
//!
//! Each handler opens the stores it needs, runs one operation and prints a
//! summary.

use crate::config::{BuildConfig, ExportConfig, MergeConfig, SnapshotFiles};
use crate::core::SnapshotState;
use crate::error::Result;
use crate::pipeline::{self, ExportPipeline, SnapshotBuilder, SnapshotSummary};
use crate::storage::{merge_sources, KeyValueStore, MergeSource, Partition, RocksStore};
use chrono::Utc;
use std::path::Path;

/// Result type for CLI operations
pub type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Build the local snapshot database
pub fn cmd_build(config: &BuildConfig) -> CliResult<()> {
    let started = Utc::now();
    println!("🏗️  Building local snapshot database at {:?}", config.ls_db_dir);

    let source = RocksStore::open(
        &config.spent_addresses_db_dir,
        &Partition::SPENT_ADDRESSES_DB,
        &config.store,
    )?;
    let target = RocksStore::open(&config.ls_db_dir, &Partition::LOCAL_SNAPSHOTS_DB, &config.store)?;

    println!("   📥 Ingesting spent addresses from {:?}", config.spent_addresses_db_dir);
    let report = SnapshotBuilder::new(&target, config.ingest.clone()).build(&source, &config.files)?;

    println!("✅ Local snapshot database built!");
    println!("   Spent addresses: {}", report.ingest.written);
    print_snapshot(&report.snapshot);
    println!("   ⏱️  Took {}s", (Utc::now() - started).num_seconds());
    Ok(())
}

/// Print the summary of the plaintext snapshot files
pub fn cmd_info(files: &SnapshotFiles) -> CliResult<()> {
    let snapshot = SnapshotState::from_files(&files.meta, &files.state)?;

    println!("📄 Local snapshot {:?}", files.meta);
    print_snapshot(&SnapshotSummary::new(&snapshot));
    Ok(())
}

/// Merge spent address sources into one database
pub fn cmd_merge(config: &MergeConfig) -> CliResult<()> {
    let started = Utc::now();
    let sources: Vec<MergeSource> = config.sources.iter().map(MergeSource::from_path).collect();
    println!("🔀 Merging {} sources into {:?}", sources.len(), config.target);

    let target = RocksStore::open(&config.target, &Partition::SPENT_ADDRESSES_DB, &config.store)?;
    let opener = |path: &Path| -> Result<Box<dyn KeyValueStore>> {
        let store = RocksStore::open(path, &Partition::SPENT_ADDRESSES_DB, &config.store)?;
        Ok(Box::new(store))
    };
    let report = merge_sources(&sources, &target, &opener, &config.ingest)?;

    for source in &report.sources {
        println!(
            "   ├─ {}: {} read, {} new, {} known",
            source.source, source.read, source.added, source.known
        );
    }
    println!(
        "   └─ Total: {} new, {} known",
        report.total_added, report.total_known
    );
    println!("✅ Merge complete in {}s", (Utc::now() - started).num_seconds());
    Ok(())
}

/// Write an export file from the local snapshot database
pub fn cmd_export(config: &ExportConfig) -> CliResult<()> {
    let started = Utc::now();
    println!(
        "📦 Exporting {:?} as {} to {:?}",
        config.ls_db_dir, config.format, config.file
    );

    let store = RocksStore::open(&config.ls_db_dir, &Partition::LOCAL_SNAPSHOTS_DB, &config.store)?;
    let report = ExportPipeline::new(&store, config.clone()).export()?;

    println!("✅ Export written!");
    println!("   ├─ File: {:?}", report.file);
    println!("   ├─ Spent addresses: {}", report.spent_addresses);
    if let Some(filter) = &report.filter {
        println!(
            "   ├─ Filter: {} of {} inserted, {} bytes",
            filter.inserted, filter.attempted, filter.size_bytes
        );
        if filter.failed > 0 {
            println!("   ├─ ⚠️  {} insertions failed", filter.failed);
        }
    }
    println!("   ├─ Size: {} bytes", report.file_size);
    println!("   └─ Took {}s", (Utc::now() - started).num_seconds());
    Ok(())
}

/// Verify an export file and print what it holds
pub fn cmd_export_info(file: &Path, json: bool) -> CliResult<()> {
    let summary = pipeline::inspect(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("🔍 Export file {:?} verified", file);
    println!("{}", summary);
    Ok(())
}

/// Restore an export file into a local snapshot database
pub fn cmd_import(file: &Path, config: &ExportConfig) -> CliResult<()> {
    println!("📥 Importing {:?} into {:?}", file, config.ls_db_dir);

    let store = RocksStore::open(&config.ls_db_dir, &Partition::LOCAL_SNAPSHOTS_DB, &config.store)?;
    let report = ExportPipeline::new(&store, config.clone()).import(file)?;

    println!("✅ Import complete!");
    println!("{}", report.summary.snapshot);
    println!("   Restored spent addresses: {}", report.restored_spent_addresses);
    if report.unrestorable_spent_addresses > 0 {
        println!(
            "   ⚠️  {} spent addresses are filter-only and were not restored",
            report.unrestorable_spent_addresses
        );
    }
    Ok(())
}

fn print_snapshot(summary: &SnapshotSummary) {
    println!("{}", summary);
    if !summary.supply.correct {
        println!("   ❌ Ledger supply does not add up!");
    }
}
