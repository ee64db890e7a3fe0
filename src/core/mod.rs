//! Core data model
//!
//! This module contains:
//! - Hashes and the ternary address codec
//! - The local snapshot state and its plaintext parser

pub mod address;
pub mod snapshot;

pub use address::{
    AddressCodec, Hash, TernaryCodec, ADDRESS_WITH_CHECKSUM_TRYTES, HASH_BYTES, HASH_TRYTES,
};
pub use snapshot::{
    SnapshotState, SupplyCheck, FIXED_HEADER_BYTES, INDEX_ENTRY_BYTES, LEDGER_ENTRY_BYTES,
    TOTAL_SUPPLY,
};
