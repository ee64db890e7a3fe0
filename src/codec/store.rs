//! Store encoding of a [`SnapshotState`]
//!
//! Big-endian, persisted under [`LOCAL_SNAPSHOT_KEY`] of the local snapshot
//! partition. The ledger entry count is not stored; it is whatever is left
//! after the seen milestones divided by the entry width.

use crate::codec::wire::{self, count_i32, Endian, WireReader};
use crate::core::{SnapshotState, INDEX_ENTRY_BYTES, LEDGER_ENTRY_BYTES};
use crate::error::Result;

/// Key of the persisted snapshot (big-endian i32 `1`)
pub const LOCAL_SNAPSHOT_KEY: [u8; 4] = 1i32.to_be_bytes();

const ENDIAN: Endian = Endian::Big;

pub fn encode_store(snapshot: &SnapshotState) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(snapshot.size_in_bytes());
    buf.extend_from_slice(snapshot.milestone_hash().as_bytes());
    ENDIAN.write_i32(&mut buf, snapshot.milestone_index())?;
    ENDIAN.write_i64(&mut buf, snapshot.milestone_timestamp())?;
    ENDIAN.write_i32(
        &mut buf,
        count_i32("solid entry points", snapshot.solid_entry_points().len())?,
    )?;
    ENDIAN.write_i32(
        &mut buf,
        count_i32("seen milestones", snapshot.seen_milestones().len())?,
    )?;
    wire::write_index_entries(&mut buf, ENDIAN, snapshot.solid_entry_points())?;
    wire::write_index_entries(&mut buf, ENDIAN, snapshot.seen_milestones())?;
    wire::write_ledger_entries(&mut buf, ENDIAN, snapshot.ledger_state())?;
    Ok(buf)
}

pub fn decode_store(bytes: &[u8]) -> Result<SnapshotState> {
    let mut reader = WireReader::new(bytes, ENDIAN);
    let milestone_hash = reader.hash("milestone hash")?;
    let milestone_index = reader.i32("milestone index")?;
    let milestone_timestamp = reader.i64("milestone timestamp")?;
    let solid_entry_points_count = reader.count("solid entry points", INDEX_ENTRY_BYTES)?;
    let seen_milestones_count = reader.count("seen milestones", INDEX_ENTRY_BYTES)?;

    let solid_entry_points = reader.index_entries(solid_entry_points_count, "solid entry points")?;
    let seen_milestones = reader.index_entries(seen_milestones_count, "seen milestones")?;

    let ledger_count = reader.remaining() / LEDGER_ENTRY_BYTES;
    let leftover = reader.remaining() % LEDGER_ENTRY_BYTES;
    if leftover != 0 {
        log::warn!(
            "persisted local snapshot has {} trailing bytes after {} ledger entries, ignoring them",
            leftover,
            ledger_count
        );
    }
    let ledger_state = reader.ledger_entries(ledger_count, "ledger state")?;

    Ok(SnapshotState::new(
        milestone_hash,
        milestone_index,
        milestone_timestamp,
        solid_entry_points,
        seen_milestones,
        ledger_state,
    ))
}
