//! Streaming copy between stores
//!
//! A scoped producer thread walks the source partition in key order and
//! hands every key over a bounded channel to the calling thread, which feeds
//! it to a sink. Closing the sender is the only end-of-stream signal.

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::storage::kv::{KeyValueStore, Partition, SPENT_ADDRESS_VALUE};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::thread;

const PROGRESS_EVERY: usize = 1_000_000;

/// Outcome of one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Keys read from the source
    pub read: usize,
    /// Keys the sink accepted
    pub written: usize,
}

/// Stream every key of `partition` into `sink`
///
/// A sink error stops the producer and is returned; otherwise a producer
/// error is returned once the channel has drained.
pub fn stream_keys<F>(
    source: &dyn KeyValueStore,
    partition: Partition,
    config: &IngestConfig,
    mut sink: F,
) -> Result<IngestReport>
where
    F: FnMut(Vec<u8>) -> Result<()>,
{
    let (tx, rx) = bounded::<Vec<u8>>(config.channel_capacity);

    thread::scope(|scope| {
        let producer = scope.spawn(move || -> Result<usize> {
            let mut read = 0;
            for pair in source.iter(partition)? {
                let (key, _) = pair?;
                read += 1;
                if tx.send(key).is_err() {
                    // receiver dropped after a sink failure
                    break;
                }
            }
            Ok(read)
        });

        let mut written = 0;
        let mut consumed = Ok(());
        for key in rx.iter() {
            if let Err(e) = sink(key) {
                consumed = Err(e);
                break;
            }
            written += 1;
            if written % PROGRESS_EVERY == 0 {
                log::debug!("{} keys from {}", written, partition);
            }
        }
        drop(rx);

        let produced = producer
            .join()
            .map_err(|_| Error::Store(format!("reader of {} panicked", partition)))?;
        consumed?;
        let read = produced?;
        Ok(IngestReport { read, written })
    })
}

/// Copy every spent address of `source` into `dest`
pub fn ingest_spent_addresses(
    source: &dyn KeyValueStore,
    dest: &dyn KeyValueStore,
    config: &IngestConfig,
) -> Result<IngestReport> {
    let report = stream_keys(source, Partition::SpentAddresses, config, |key| {
        dest.put(Partition::SpentAddresses, &key, SPENT_ADDRESS_VALUE)
    })?;
    log::info!("ingested {} spent addresses", report.written);
    Ok(report)
}
