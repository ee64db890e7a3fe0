//! Address and hash representation
//!
//! Hashes travel in two forms:
//! - 81 trytes of text (`9A-Z`), the form found in snapshot files and
//!   address lists
//! - 49 bytes of T5B1 binary (five balanced trits per byte), the form stored
//!   in the database and in export files
//!
//! 243 trits do not fill 49 bytes exactly; the last byte carries three
//! meaningful trits and decoding always yields exactly 81 trytes.

use crate::error::FormatError;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

/// Binary width of a hash/address
pub const HASH_BYTES: usize = 49;

/// Textual width of a hash/address
pub const HASH_TRYTES: usize = 81;

/// Textual width of an address carrying its 9-tryte checksum
pub const ADDRESS_WITH_CHECKSUM_TRYTES: usize = 90;

const TRITS_PER_TRYTE: usize = 3;
const TRITS_PER_BYTE: usize = 5;
const HASH_TRITS: usize = HASH_TRYTES * TRITS_PER_TRYTE;

/// Largest magnitude five balanced trits can express (1+3+9+27+81)
const MAX_TRIT_GROUP: i8 = 121;

const TRYTE_ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// =============================================================================
// Hash
// =============================================================================

/// A fixed-width binary hash (milestone, transaction or address)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_BYTES]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, which must be exactly [`HASH_BYTES`] long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FormatError> {
        let raw: [u8; HASH_BYTES] = bytes.try_into().map_err(|_| FormatError::HashLength {
            expected: HASH_BYTES,
            actual: bytes.len(),
        })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    /// Parse the textual form
    pub fn from_trytes(text: &str) -> Result<Self, FormatError> {
        TernaryCodec.encode(text)
    }

    /// Render the textual form
    pub fn to_trytes(&self) -> Result<String, FormatError> {
        TernaryCodec.decode(self)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Hash {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_trytes(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_trytes() {
            Ok(trytes) => f.write_str(&trytes),
            // not T5B1, show what is actually there
            Err(_) => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Conversion between textual and binary hashes
pub trait AddressCodec {
    /// Text to binary; malformed text is a [`FormatError`]
    fn encode(&self, text: &str) -> Result<Hash, FormatError>;

    /// Binary to text, always [`HASH_TRYTES`] long
    fn decode(&self, hash: &Hash) -> Result<String, FormatError>;
}

/// Balanced ternary T5B1 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct TernaryCodec;

impl AddressCodec for TernaryCodec {
    fn encode(&self, text: &str) -> Result<Hash, FormatError> {
        let text = text.trim();
        let trytes = match text.len() {
            ADDRESS_WITH_CHECKSUM_TRYTES => &text.as_bytes()[..HASH_TRYTES],
            len if len <= HASH_TRYTES => text.as_bytes(),
            len => {
                return Err(FormatError::AddressLength {
                    len,
                    max: HASH_TRYTES,
                })
            }
        };

        // shorter input is right-padded with '9' (zero trits)
        let mut trits = [0i8; HASH_TRITS];
        for (position, &ch) in trytes.iter().enumerate() {
            let value = tryte_value(ch).ok_or(FormatError::InvalidTryte {
                ch: ch as char,
                position,
            })?;
            let [t0, t1, t2] = tryte_to_trits(value);
            trits[position * 3] = t0;
            trits[position * 3 + 1] = t1;
            trits[position * 3 + 2] = t2;
        }

        let mut bytes = [0u8; HASH_BYTES];
        for (byte, group) in bytes.iter_mut().zip(trits.chunks(TRITS_PER_BYTE)) {
            let value = group
                .iter()
                .rev()
                .fold(0i8, |acc, &trit| acc * 3 + trit);
            *byte = value as u8;
        }

        Ok(Hash(bytes))
    }

    fn decode(&self, hash: &Hash) -> Result<String, FormatError> {
        let mut trits = Vec::with_capacity(HASH_BYTES * TRITS_PER_BYTE);
        for (position, &byte) in hash.0.iter().enumerate() {
            let mut value = byte as i8;
            if !(-MAX_TRIT_GROUP..=MAX_TRIT_GROUP).contains(&value) {
                return Err(FormatError::InvalidTritByte { byte, position });
            }
            for _ in 0..TRITS_PER_BYTE {
                let trit = balanced_rem(value as i32) as i8;
                trits.push(trit);
                value = (value - trit) / 3;
            }
        }

        let text = trits[..HASH_TRITS]
            .chunks(TRITS_PER_TRYTE)
            .map(|t| tryte_char(t[0] + 3 * t[1] + 9 * t[2]))
            .collect();
        Ok(text)
    }
}

fn tryte_value(ch: u8) -> Option<i8> {
    match ch {
        b'9' => Some(0),
        b'A'..=b'M' => Some((ch - b'A') as i8 + 1),
        b'N'..=b'Z' => Some((ch - b'N') as i8 - 13),
        _ => None,
    }
}

fn tryte_char(value: i8) -> char {
    let index = if value < 0 { value + 27 } else { value };
    TRYTE_ALPHABET[index as usize] as char
}

fn tryte_to_trits(mut value: i8) -> [i8; 3] {
    let mut trits = [0i8; 3];
    for trit in trits.iter_mut() {
        *trit = balanced_rem(value as i32) as i8;
        value = (value - *trit) / 3;
    }
    trits
}

/// Remainder in {-1, 0, 1}
fn balanced_rem(value: i32) -> i32 {
    match value.rem_euclid(3) {
        2 => -1,
        r => r,
    }
}

// =============================================================================
// Tests
// =============================================================================
