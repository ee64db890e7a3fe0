//! Endian-aware primitives shared by every binary layout

use crate::core::{Hash, HASH_BYTES};
use crate::error::FormatError;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Byte order of multi-byte fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn write_i32<W: Write>(self, w: &mut W, v: i32) -> io::Result<()> {
        match self {
            Endian::Big => w.write_i32::<BigEndian>(v),
            Endian::Little => w.write_i32::<LittleEndian>(v),
        }
    }

    pub fn write_i64<W: Write>(self, w: &mut W, v: i64) -> io::Result<()> {
        match self {
            Endian::Big => w.write_i64::<BigEndian>(v),
            Endian::Little => w.write_i64::<LittleEndian>(v),
        }
    }

    pub fn write_u64<W: Write>(self, w: &mut W, v: u64) -> io::Result<()> {
        match self {
            Endian::Big => w.write_u64::<BigEndian>(v),
            Endian::Little => w.write_u64::<LittleEndian>(v),
        }
    }
}

/// Count as the format's i32, rejecting anything larger
pub fn count_i32(field: &'static str, count: usize) -> Result<i32, FormatError> {
    i32::try_from(count).map_err(|_| FormatError::CountOverflow { field, count })
}

pub fn write_index_entries<W: Write>(
    w: &mut W,
    endian: Endian,
    entries: &BTreeMap<Hash, i32>,
) -> io::Result<()> {
    for (hash, index) in entries {
        w.write_all(hash.as_bytes())?;
        endian.write_i32(w, *index)?;
    }
    Ok(())
}

pub fn write_ledger_entries<W: Write>(
    w: &mut W,
    endian: Endian,
    entries: &BTreeMap<Hash, u64>,
) -> io::Result<()> {
    for (address, balance) in entries {
        w.write_all(address.as_bytes())?;
        endian.write_u64(w, *balance)?;
    }
    Ok(())
}

// =============================================================================
// Reader
// =============================================================================

/// Cursor over an in-memory buffer; running out of bytes is a
/// [`FormatError::Truncated`] naming the section being read
pub struct WireReader<'a> {
    buf: &'a [u8],
    endian: Endian,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self { buf, endian }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], FormatError> {
        if self.buf.len() < len {
            return Err(FormatError::Truncated { section });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn hash(&mut self, section: &'static str) -> Result<Hash, FormatError> {
        Hash::from_slice(self.bytes(HASH_BYTES, section)?)
    }

    pub fn i32(&mut self, section: &'static str) -> Result<i32, FormatError> {
        let truncated = |_| FormatError::Truncated { section };
        match self.endian {
            Endian::Big => self.buf.read_i32::<BigEndian>().map_err(truncated),
            Endian::Little => self.buf.read_i32::<LittleEndian>().map_err(truncated),
        }
    }

    pub fn i64(&mut self, section: &'static str) -> Result<i64, FormatError> {
        let truncated = |_| FormatError::Truncated { section };
        match self.endian {
            Endian::Big => self.buf.read_i64::<BigEndian>().map_err(truncated),
            Endian::Little => self.buf.read_i64::<LittleEndian>().map_err(truncated),
        }
    }

    pub fn u64(&mut self, section: &'static str) -> Result<u64, FormatError> {
        let truncated = |_| FormatError::Truncated { section };
        match self.endian {
            Endian::Big => self.buf.read_u64::<BigEndian>().map_err(truncated),
            Endian::Little => self.buf.read_u64::<LittleEndian>().map_err(truncated),
        }
    }

    /// A non-negative i32 count whose entries must fit in what is left
    pub fn count(
        &mut self,
        field: &'static str,
        entry_bytes: usize,
    ) -> Result<usize, FormatError> {
        let value = self.i32(field)?;
        let count = usize::try_from(value).map_err(|_| FormatError::NegativeCount { field, value })?;
        if count.saturating_mul(entry_bytes) > self.remaining() {
            return Err(FormatError::Truncated { section: field });
        }
        Ok(count)
    }

    pub fn index_entries(
        &mut self,
        count: usize,
        section: &'static str,
    ) -> Result<BTreeMap<Hash, i32>, FormatError> {
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let hash = self.hash(section)?;
            let index = self.i32(section)?;
            insert_unique(&mut entries, hash, index, section)?;
        }
        Ok(entries)
    }

    pub fn ledger_entries(
        &mut self,
        count: usize,
        section: &'static str,
    ) -> Result<BTreeMap<Hash, u64>, FormatError> {
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let address = self.hash(section)?;
            let balance = self.u64(section)?;
            insert_unique(&mut entries, address, balance, section)?;
        }
        Ok(entries)
    }

    pub fn finish(self) -> Result<(), FormatError> {
        match self.buf.len() {
            0 => Ok(()),
            count => Err(FormatError::TrailingBytes { count }),
        }
    }
}

fn insert_unique<V>(
    entries: &mut BTreeMap<Hash, V>,
    key: Hash,
    value: V,
    section: &'static str,
) -> Result<(), FormatError> {
    if entries.insert(key, value).is_some() {
        return Err(FormatError::DuplicateKey {
            section,
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness_of_written_fields() {
        let mut big = Vec::new();
        Endian::Big.write_i32(&mut big, 1).unwrap();
        assert_eq!(big, [0, 0, 0, 1]);

        let mut little = Vec::new();
        Endian::Little.write_i32(&mut little, 1).unwrap();
        assert_eq!(little, [1, 0, 0, 0]);

        let mut reader = WireReader::new(&little, Endian::Little);
        assert_eq!(reader.i32("x").unwrap(), 1);
        reader.finish().unwrap();
    }

    #[test]
    fn test_truncated_and_negative_counts() {
        let mut reader = WireReader::new(&[0, 0], Endian::Big);
        assert_eq!(
            reader.i32("header"),
            Err(FormatError::Truncated { section: "header" })
        );

        let raw = (-1i32).to_be_bytes();
        let mut reader = WireReader::new(&raw, Endian::Big);
        assert!(matches!(
            reader.count("ledger", 57),
            Err(FormatError::NegativeCount { value: -1, .. })
        ));

        // a count that cannot possibly fit is caught before allocating
        let raw = 1_000_000i32.to_be_bytes();
        let mut reader = WireReader::new(&raw, Endian::Big);
        assert!(matches!(
            reader.count("ledger", 57),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let hash = Hash::from_trytes("DUP").unwrap();
        let mut buf = Vec::new();
        for _ in 0..2 {
            buf.extend_from_slice(hash.as_bytes());
            Endian::Big.write_i32(&mut buf, 5).unwrap();
        }
        let mut reader = WireReader::new(&buf, Endian::Big);
        assert!(matches!(
            reader.index_entries(2, "solid entry points"),
            Err(FormatError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_count_overflow() {
        assert!(count_i32("spent addresses", i32::MAX as usize + 1).is_err());
        assert_eq!(count_i32("spent addresses", 3).unwrap(), 3);
    }
}
