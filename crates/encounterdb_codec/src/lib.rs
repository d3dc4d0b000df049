//! # EncounterDB Codec
//!
//! Serialization boundary of the EncounterDB engine.
//!
//! This crate knows nothing about clinical content. It provides:
//! - [`Value`], the cell type stored in engine rows
//! - [`Document`], an opaque JSON sub-document stored in a single column
//! - Snapshot framing: [`encode_snapshot`] and [`decode_snapshot`] turn any
//!   serializable engine state into a checksummed byte sequence and back
//!
//! ## Usage
//!
//! ```
//! use encounterdb_codec::{decode_snapshot, encode_snapshot, Document, Value};
//!
//! let cells = vec![Value::Integer(1), Value::Text(Document::empty().into_string())];
//! let bytes = encode_snapshot(&cells).unwrap();
//! let decoded: Vec<Value> = decode_snapshot(&bytes).unwrap();
//! assert_eq!(cells, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod snapshot;
mod value;

pub use document::Document;
pub use error::{CodecError, CodecResult};
pub use snapshot::{
    decode_snapshot, encode_snapshot, read_header, SnapshotHeader, FOOTER_SIZE, HEADER_SIZE,
    SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
pub use value::Value;
