//! Export file encoding
//!
//! ```text
//! version   u8
//! header    milestone hash (49), index i32, timestamp i64,
//!           counts i32: solid entry points, seen milestones,
//!                       ledger entries, spent addresses
//! sections  (hash, i32)* (hash, i32)* (hash, u64)*
//! spent     gzipped:     filter length i32, filter image
//!           checksummed: (hash)*
//! trailer   checksummed: SHA-256 over every preceding byte
//! ```
//!
//! Field byte order and the container come from the version's row in
//! [`FORMATS`](crate::codec::format::FORMATS).

use crate::codec::format::{FormatSpec, FormatVersion, SpentEncoding};
use crate::codec::wire::{self, count_i32, WireReader};
use crate::core::{Hash, SnapshotState, HASH_BYTES, INDEX_ENTRY_BYTES, LEDGER_ENTRY_BYTES};
use crate::crypto::{sha256, DigestWriter, DIGEST_BYTES};
use crate::error::{ConfigurationError, FormatError, IntegrityError, Result};
use crate::filter::SpentAddressFilter;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Largest inflated gzip stream a decode accepts
pub const MAX_DECOMPRESSED_BYTES: u64 = 2 << 30;

// =============================================================================
// Payloads
// =============================================================================

/// Spent addresses handed to the encoder
pub enum SpentPayload<'a> {
    Filter(&'a SpentAddressFilter),
    /// `count` addresses, streamed
    List {
        count: usize,
        addresses: Box<dyn Iterator<Item = Result<Hash>> + 'a>,
    },
    Omitted,
}

/// Spent addresses recovered by the decoder
#[derive(Debug)]
pub enum SpentAddresses {
    Filter(SpentAddressFilter),
    List(Vec<Hash>),
    Omitted,
}

impl SpentAddresses {
    pub fn len(&self) -> usize {
        match self {
            SpentAddresses::Filter(filter) => filter.len(),
            SpentAddresses::List(list) => list.len(),
            SpentAddresses::Omitted => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Membership; approximate for a filter
    pub fn contains(&self, address: &Hash) -> bool {
        match self {
            SpentAddresses::Filter(filter) => filter.contains(address),
            SpentAddresses::List(list) => list.contains(address),
            SpentAddresses::Omitted => false,
        }
    }
}

/// A decoded export file
#[derive(Debug)]
pub struct ExportFile {
    pub version: FormatVersion,
    pub snapshot: SnapshotState,
    pub spent_addresses: SpentAddresses,
    /// Byte length of the filter section, if any
    pub filter_bytes: usize,
}

// =============================================================================
// Encoding
// =============================================================================

/// Write a complete export file into `writer` and hand the writer back
pub fn encode_export<W: Write>(
    writer: W,
    version: FormatVersion,
    snapshot: &SnapshotState,
    spent: SpentPayload<'_>,
) -> Result<W> {
    let spec = version.spec();
    check_payload(spec, &spent)?;

    if spec.gzip {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        write_framed(&mut encoder, spec, snapshot, spent)?;
        Ok(encoder.finish()?)
    } else {
        let mut writer = writer;
        write_framed(&mut writer, spec, snapshot, spent)?;
        Ok(writer)
    }
}

fn check_payload(spec: &FormatSpec, spent: &SpentPayload<'_>) -> Result<()> {
    let fits = matches!(
        (spec.spent, spent),
        (_, SpentPayload::Omitted)
            | (SpentEncoding::CuckooFilter, SpentPayload::Filter(_))
            | (SpentEncoding::RawList, SpentPayload::List { .. })
    );
    if !fits {
        return Err(ConfigurationError::Invalid(format!(
            "version {} cannot carry this spent address representation",
            spec.version
        ))
        .into());
    }
    Ok(())
}

fn write_framed<W: Write>(
    writer: &mut W,
    spec: &FormatSpec,
    snapshot: &SnapshotState,
    spent: SpentPayload<'_>,
) -> Result<()> {
    if spec.digest_trailer {
        let mut digesting = DigestWriter::new(&mut *writer);
        write_body(&mut digesting, spec, snapshot, spent)?;
        log::debug!("digest covers {} bytes", digesting.written());
        let (digest, writer) = digesting.finish();
        writer.write_all(&digest)?;
    } else {
        write_body(writer, spec, snapshot, spent)?;
    }
    Ok(())
}

fn write_body<W: Write>(
    w: &mut W,
    spec: &FormatSpec,
    snapshot: &SnapshotState,
    spent: SpentPayload<'_>,
) -> Result<()> {
    let endian = spec.endian;
    let spent_count = match &spent {
        SpentPayload::Filter(filter) => filter.len(),
        SpentPayload::List { count, .. } => *count,
        SpentPayload::Omitted => 0,
    };

    w.write_all(&[spec.version])?;
    w.write_all(snapshot.milestone_hash().as_bytes())?;
    endian.write_i32(w, snapshot.milestone_index())?;
    endian.write_i64(w, snapshot.milestone_timestamp())?;
    for (field, count) in [
        ("solid entry points", snapshot.solid_entry_points().len()),
        ("seen milestones", snapshot.seen_milestones().len()),
        ("ledger entries", snapshot.ledger_state().len()),
        ("spent addresses", spent_count),
    ] {
        endian.write_i32(w, count_i32(field, count)?)?;
    }

    wire::write_index_entries(w, endian, snapshot.solid_entry_points())?;
    wire::write_index_entries(w, endian, snapshot.seen_milestones())?;
    wire::write_ledger_entries(w, endian, snapshot.ledger_state())?;

    match spent {
        SpentPayload::Filter(filter) => {
            let image = filter.to_image();
            endian.write_i32(w, count_i32("cuckoo filter bytes", image.len())?)?;
            w.write_all(&image)?;
        }
        SpentPayload::List { count, addresses } => {
            let mut written = 0;
            for address in addresses {
                if written == count {
                    return Err(IntegrityError::ListCount {
                        declared: count,
                        written: written + 1,
                    }
                    .into());
                }
                w.write_all(address?.as_bytes())?;
                written += 1;
            }
            if written != count {
                return Err(IntegrityError::ListCount {
                    declared: count,
                    written,
                }
                .into());
            }
        }
        SpentPayload::Omitted if spec.spent == SpentEncoding::CuckooFilter => {
            endian.write_i32(w, 0)?;
        }
        SpentPayload::Omitted => {}
    }
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Version byte of a file, read without interpreting anything else
///
/// Only the first byte of a gzip stream is inflated.
pub fn peek_version(bytes: &[u8]) -> Result<FormatVersion> {
    let byte = if is_gzip(bytes) {
        let mut head = Vec::with_capacity(1);
        GzDecoder::new(bytes)
            .take(1)
            .read_to_end(&mut head)
            .map_err(|e| FormatError::Gzip(e.to_string()))?;
        head.first().copied()
    } else {
        bytes.first().copied()
    };
    let byte = byte.ok_or(FormatError::Truncated { section: "version" })?;
    Ok(FormatVersion::from_byte(byte)?)
}

/// Decode and verify a complete export file
pub fn decode_export(bytes: &[u8]) -> Result<ExportFile> {
    decode_export_limited(bytes, MAX_DECOMPRESSED_BYTES)
}

/// Like [`decode_export`], inflating at most `limit` bytes of a gzip stream
pub fn decode_export_limited(bytes: &[u8], limit: u64) -> Result<ExportFile> {
    let version = peek_version(bytes)?;
    let spec = version.spec();

    if spec.gzip != is_gzip(bytes) {
        return Err(FormatError::ContainerMismatch {
            version: spec.version,
            expected: if spec.gzip { "be" } else { "not be" },
        }
        .into());
    }

    let data = unwrap_container(bytes, limit)?;
    let body = if spec.digest_trailer {
        verify_trailer(&data)?
    } else {
        &data[..]
    };

    decode_body(&body[1..], version)
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

fn unwrap_container(bytes: &[u8], limit: u64) -> Result<Cow<'_, [u8]>> {
    if !is_gzip(bytes) {
        return Ok(bytes.into());
    }
    let mut data = Vec::new();
    GzDecoder::new(bytes)
        .take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| FormatError::Gzip(e.to_string()))?;
    if data.len() as u64 > limit {
        return Err(FormatError::Oversized { limit }.into());
    }
    Ok(data.into())
}

/// Check the trailing digest and return everything before it
fn verify_trailer(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 1 + DIGEST_BYTES {
        return Err(IntegrityError::MissingTrailer {
            size: data.len(),
            trailer: DIGEST_BYTES,
        }
        .into());
    }
    let (body, trailer) = data.split_at(data.len() - DIGEST_BYTES);
    let computed = sha256(body);
    if computed[..] != trailer[..] {
        return Err(IntegrityError::DigestMismatch {
            expected: hex::encode(trailer),
            actual: hex::encode(computed),
        }
        .into());
    }
    Ok(body)
}

fn decode_body(body: &[u8], version: FormatVersion) -> Result<ExportFile> {
    let spec = version.spec();
    let mut reader = WireReader::new(body, spec.endian);

    let milestone_hash = reader.hash("milestone hash")?;
    let milestone_index = reader.i32("milestone index")?;
    let milestone_timestamp = reader.i64("milestone timestamp")?;
    let solid_entry_points_count = reader.count("solid entry points", INDEX_ENTRY_BYTES)?;
    let seen_milestones_count = reader.count("seen milestones", INDEX_ENTRY_BYTES)?;
    let ledger_count = reader.count("ledger entries", LEDGER_ENTRY_BYTES)?;
    let spent_entry_bytes = match spec.spent {
        SpentEncoding::RawList => HASH_BYTES,
        SpentEncoding::CuckooFilter => 0,
    };
    let spent_count = reader.count("spent addresses", spent_entry_bytes)?;

    let solid_entry_points = reader.index_entries(solid_entry_points_count, "solid entry points")?;
    let seen_milestones = reader.index_entries(seen_milestones_count, "seen milestones")?;
    let ledger_state = reader.ledger_entries(ledger_count, "ledger entries")?;

    let mut filter_bytes = 0;
    let spent_addresses = match spec.spent {
        SpentEncoding::CuckooFilter => {
            filter_bytes = reader.count("cuckoo filter bytes", 1)?;
            let image = reader.bytes(filter_bytes, "cuckoo filter")?;
            if filter_bytes == 0 && spent_count == 0 {
                SpentAddresses::Omitted
            } else {
                let filter = SpentAddressFilter::from_image(image)?;
                filter.validate_count(spent_count)?;
                SpentAddresses::Filter(filter)
            }
        }
        SpentEncoding::RawList if spent_count == 0 => SpentAddresses::Omitted,
        SpentEncoding::RawList => {
            let mut list = Vec::with_capacity(spent_count);
            for _ in 0..spent_count {
                list.push(reader.hash("spent addresses")?);
            }
            SpentAddresses::List(list)
        }
    };
    reader.finish()?;

    let snapshot = SnapshotState::new(
        milestone_hash,
        milestone_index,
        milestone_timestamp,
        solid_entry_points,
        seen_milestones,
        ledger_state,
    );

    Ok(ExportFile {
        version,
        snapshot,
        spent_addresses,
        filter_bytes,
    })
}

// =============================================================================
// Tests
// =============================================================================
