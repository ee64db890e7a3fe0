//! Binary encodings of the snapshot state
//!
//! - `store`: the big-endian blob persisted in the database
//! - `export`: the versioned single-file interchange format
//! - `format`: the version dispatch table both export generations share

pub mod export;
pub mod format;
pub mod store;
pub mod wire;

pub use export::{
    decode_export, decode_export_limited, encode_export, peek_version, ExportFile,
    SpentAddresses, SpentPayload, MAX_DECOMPRESSED_BYTES,
};
pub use format::{FormatSpec, FormatVersion, SpentEncoding, FORMATS};
pub use store::{decode_store, encode_store, LOCAL_SNAPSHOT_KEY};
pub use wire::Endian;
