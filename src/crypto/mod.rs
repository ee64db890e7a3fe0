//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 content hashing
//! - A digesting writer for file trailers

pub mod hash;

pub use hash::{sha256, DigestWriter, DIGEST_BYTES};
