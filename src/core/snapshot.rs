//! Local snapshot state
//!
//! The minimal data a node needs to bootstrap without replaying history:
//! - the milestone the snapshot was taken at
//! - solid entry points and the window of seen milestones
//! - the balance of every address
//!
//! A [`SnapshotState`] is built once, either from the plaintext meta/state
//! files or by decoding bytes, and never changed afterwards.

use crate::core::address::{Hash, HASH_BYTES};
use crate::error::{Error, FormatError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

/// Total token supply; the ledger state must always sum to this
pub const TOTAL_SUPPLY: u64 = 2_779_530_283_277_761;

/// Fixed part of the store encoding: hash, index, timestamp, two counts
pub const FIXED_HEADER_BYTES: usize = HASH_BYTES + 4 + 8 + 4 + 4;

/// A hash keyed by milestone index
pub const INDEX_ENTRY_BYTES: usize = HASH_BYTES + 4;

/// An address keyed by balance
pub const LEDGER_ENTRY_BYTES: usize = HASH_BYTES + 8;

// =============================================================================
// Snapshot State
// =============================================================================

/// The canonical ledger checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotState {
    milestone_hash: Hash,
    milestone_index: i32,
    milestone_timestamp: i64,
    solid_entry_points: BTreeMap<Hash, i32>,
    seen_milestones: BTreeMap<Hash, i32>,
    ledger_state: BTreeMap<Hash, u64>,
}

impl SnapshotState {
    pub fn new(
        milestone_hash: Hash,
        milestone_index: i32,
        milestone_timestamp: i64,
        solid_entry_points: BTreeMap<Hash, i32>,
        seen_milestones: BTreeMap<Hash, i32>,
        ledger_state: BTreeMap<Hash, u64>,
    ) -> Self {
        Self {
            milestone_hash,
            milestone_index,
            milestone_timestamp,
            solid_entry_points,
            seen_milestones,
            ledger_state,
        }
    }

    /// Parse the plaintext meta and state files
    pub fn from_files(meta: &Path, state: &Path) -> Result<Self> {
        let meta_file = File::open(meta).map_err(|e| Error::io(meta, e))?;
        let state_file = File::open(state).map_err(|e| Error::io(state, e))?;
        Self::from_readers(
            BufReader::new(meta_file),
            &meta.display().to_string(),
            BufReader::new(state_file),
            &state.display().to_string(),
        )
    }

    /// Parse meta and state sources
    ///
    /// The meta source starts with five bare lines (milestone hash, index,
    /// timestamp, solid entry point count, seen milestone count) followed by
    /// `hash;index` lines: the first `solid entry point count` of them are
    /// solid entry points, the rest seen milestones. The state source holds
    /// `address;balance` lines. The seen milestone count is informational
    /// only.
    pub fn from_readers<M: BufRead, S: BufRead>(
        meta: M,
        meta_name: &str,
        state: S,
        state_name: &str,
    ) -> Result<Self> {
        let mut meta_lines = NumberedLines::new(meta, meta_name);

        let milestone_hash = {
            let (line, text) = meta_lines.header(1, "milestone hash")?;
            parse_hash(&text, meta_name, line)?
        };
        let milestone_index: i32 = meta_lines.header_value(2, "milestone index")?;
        let milestone_timestamp: i64 = meta_lines.header_value(3, "milestone timestamp")?;
        let mut solid_entry_points_left: usize =
            meta_lines.header_value(4, "solid entry points count")?;
        // informational only, the remaining lines decide
        meta_lines.header(5, "seen milestones count")?;

        let mut solid_entry_points = BTreeMap::new();
        let mut seen_milestones = BTreeMap::new();
        while let Some((line, text)) = meta_lines.next_line()? {
            let (hash, index) = parse_pair::<i32>(&text, meta_name, line)?;
            if solid_entry_points_left > 0 {
                insert_unique(&mut solid_entry_points, hash, index, meta_name, line)?;
                solid_entry_points_left -= 1;
            } else {
                insert_unique(&mut seen_milestones, hash, index, meta_name, line)?;
            }
        }

        let mut ledger_state = BTreeMap::new();
        let mut state_lines = NumberedLines::new(state, state_name);
        while let Some((line, text)) = state_lines.next_line()? {
            let (address, balance) = parse_pair::<u64>(&text, state_name, line)?;
            insert_unique(&mut ledger_state, address, balance, state_name, line)?;
        }

        Ok(Self::new(
            milestone_hash,
            milestone_index,
            milestone_timestamp,
            solid_entry_points,
            seen_milestones,
            ledger_state,
        ))
    }

    pub fn milestone_hash(&self) -> &Hash {
        &self.milestone_hash
    }

    pub fn milestone_index(&self) -> i32 {
        self.milestone_index
    }

    pub fn milestone_timestamp(&self) -> i64 {
        self.milestone_timestamp
    }

    pub fn solid_entry_points(&self) -> &BTreeMap<Hash, i32> {
        &self.solid_entry_points
    }

    pub fn seen_milestones(&self) -> &BTreeMap<Hash, i32> {
        &self.seen_milestones
    }

    pub fn ledger_state(&self) -> &BTreeMap<Hash, u64> {
        &self.ledger_state
    }

    /// Size of the store encoding
    pub fn size_in_bytes(&self) -> usize {
        FIXED_HEADER_BYTES
            + (self.solid_entry_points.len() + self.seen_milestones.len()) * INDEX_ENTRY_BYTES
            + self.ledger_state.len() * LEDGER_ENTRY_BYTES
    }

    /// Sum of all balances compared against [`TOTAL_SUPPLY`]
    pub fn supply_check(&self) -> SupplyCheck {
        let computed: u128 = self.ledger_state.values().map(|&v| v as u128).sum();
        SupplyCheck {
            computed,
            expected: TOTAL_SUPPLY,
            correct: computed == TOTAL_SUPPLY as u128,
        }
    }
}

// =============================================================================
// Supply Check
// =============================================================================

/// Outcome of the total supply sanity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplyCheck {
    pub computed: u128,
    pub expected: u64,
    pub correct: bool,
}

// =============================================================================
// Line Parsing
// =============================================================================

struct NumberedLines<'a, R> {
    reader: R,
    name: &'a str,
    line: usize,
}

impl<'a, R: BufRead> NumberedLines<'a, R> {
    fn new(reader: R, name: &'a str) -> Self {
        Self {
            reader,
            name,
            line: 0,
        }
    }

    /// Next raw line with its 1-based number
    fn raw_line(&mut self) -> Result<Option<(usize, String)>> {
        let mut buf = String::new();
        let read = self
            .reader
            .read_line(&mut buf)
            .map_err(|e| Error::io(self.name, e))?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        let trimmed = buf.trim_end_matches(['\n', '\r']).to_string();
        Ok(Some((self.line, trimmed)))
    }

    /// Next non-blank line
    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        while let Some((line, text)) = self.raw_line()? {
            if !text.trim().is_empty() {
                return Ok(Some((line, text)));
            }
        }
        Ok(None)
    }

    fn header(&mut self, expected_line: usize, field: &'static str) -> Result<(usize, String)> {
        self.raw_line()?.ok_or_else(|| {
            FormatError::MissingHeader {
                source_name: self.name.to_string(),
                line: expected_line,
                field,
            }
            .into()
        })
    }

    fn header_value<T: FromStr>(&mut self, expected_line: usize, field: &'static str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let (line, text) = self.header(expected_line, field)?;
        text.trim().parse().map_err(|e: T::Err| {
            line_error(self.name, line, format!("invalid {}: {:?} ({})", field, text, e))
        })
    }
}

fn line_error(name: &str, line: usize, reason: String) -> Error {
    FormatError::Line {
        source_name: name.to_string(),
        line,
        reason,
    }
    .into()
}

fn parse_hash(text: &str, name: &str, line: usize) -> Result<Hash> {
    Hash::from_trytes(text.trim()).map_err(|e| line_error(name, line, e.to_string()))
}

fn parse_pair<T: FromStr>(text: &str, name: &str, line: usize) -> Result<(Hash, T)>
where
    T::Err: std::fmt::Display,
{
    let (hash, value) = text
        .split_once(';')
        .ok_or_else(|| line_error(name, line, format!("expected 'hash;value', got {:?}", text)))?;
    let hash = parse_hash(hash, name, line)?;
    let value = value
        .trim()
        .parse()
        .map_err(|e: T::Err| line_error(name, line, format!("invalid value {:?} ({})", value, e)))?;
    Ok((hash, value))
}

/// A hash may appear once per section
fn insert_unique<V>(
    entries: &mut BTreeMap<Hash, V>,
    hash: Hash,
    value: V,
    name: &str,
    line: usize,
) -> Result<()> {
    if entries.contains_key(&hash) {
        return Err(line_error(name, line, format!("duplicate hash {}", hash)));
    }
    entries.insert(hash, value);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(text: &str) -> Hash {
        Hash::from_trytes(text).unwrap()
    }

    fn parse(meta: &str, state: &str) -> Result<SnapshotState> {
        SnapshotState::from_readers(meta.as_bytes(), "meta", state.as_bytes(), "state")
    }

    #[test]
    fn test_parse_example_files() {
        let ls = parse(
            "HASHM\n100\n1600000000\n1\n0\nHASHA;50\n",
            "HASHA;1000\nHASHB;2000\n",
        )
        .unwrap();

        assert_eq!(ls.milestone_hash(), &hash("HASHM"));
        assert_eq!(ls.milestone_index(), 100);
        assert_eq!(ls.milestone_timestamp(), 1_600_000_000);
        assert_eq!(ls.solid_entry_points().len(), 1);
        assert_eq!(ls.solid_entry_points()[&hash("HASHA")], 50);
        assert!(ls.seen_milestones().is_empty());
        assert_eq!(ls.ledger_state()[&hash("HASHA")], 1000);
        assert_eq!(ls.ledger_state()[&hash("HASHB")], 2000);
    }

    #[test]
    fn test_pairs_split_between_entry_points_and_seen_milestones() {
        let ls = parse(
            "HASHM\n7\n1\n2\n99\nSEPA;1\nSEPB;2\nSEENA;8\nSEENB;9\n",
            "",
        )
        .unwrap();

        assert_eq!(ls.solid_entry_points().len(), 2);
        assert_eq!(ls.seen_milestones().len(), 2);
        assert_eq!(ls.seen_milestones()[&hash("SEENB")], 9);
        assert!(ls.ledger_state().is_empty());
    }

    #[test]
    fn test_supply_check() {
        let ls = parse(
            "HASHM\n1\n1\n0\n0\n",
            &format!("ADDRA;{}\nADDRB;1\n", TOTAL_SUPPLY - 1),
        )
        .unwrap();
        let check = ls.supply_check();
        assert!(check.correct);
        assert_eq!(check.computed, TOTAL_SUPPLY as u128);

        let ls = parse("HASHM\n1\n1\n0\n0\n", "ADDRA;1\n").unwrap();
        assert!(!ls.supply_check().correct);
    }

    #[test]
    fn test_malformed_numbers_are_format_errors() {
        let err = parse("HASHM\nabc\n1\n0\n0\n", "").unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("meta line 2"));

        let err = parse("HASHM\n1\n1\n0\n0\n", "ADDRA;1\nADDRB;-5\n").unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("state line 2"));

        let err = parse("HASHM\n1\n1\n1\n0\nNOSEPARATOR\n", "").unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_duplicate_hashes_rejected() {
        let err = parse("HASHM\n1\n1\n0\n0\n", "ADDRA;5\nADDRA;7\n").unwrap_err();
        match err {
            Error::Format(FormatError::Line { source_name, line, reason }) => {
                assert_eq!(source_name, "state");
                assert_eq!(line, 2);
                assert!(reason.contains("duplicate"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = parse("HASHM\n1\n1\n2\n0\nSEPA;1\nSEPA;2\n", "").unwrap_err();
        assert!(err.to_string().contains("meta line 7"));

        // the same hash may be an entry point and a seen milestone
        let ls = parse("HASHM\n1\n1\n1\n1\nSEPA;1\nSEPA;2\n", "").unwrap();
        assert_eq!(ls.solid_entry_points()[&hash("SEPA")], 1);
        assert_eq!(ls.seen_milestones()[&hash("SEPA")], 2);
    }

    #[test]
    fn test_missing_header_line() {
        let err = parse("HASHM\n1\n", "").unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MissingHeader { line: 3, .. })
        ));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SnapshotState::from_files(&dir.path().join("nope.meta"), &dir.path().join("nope.state"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_size_in_bytes() {
        let ls = parse("HASHM\n1\n1\n1\n0\nSEPA;1\nSEENA;2\n", "ADDRA;1\n").unwrap();
        assert_eq!(ls.size_in_bytes(), 69 + 2 * 53 + 57);
    }
}
