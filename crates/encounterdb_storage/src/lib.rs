//! # EncounterDB Storage
//!
//! Blob store trait and implementations for EncounterDB.
//!
//! This crate is the lowest-level storage abstraction. A blob store is an
//! **opaque byte store addressed by key**: it never interprets the bytes it
//! holds. EncounterDB writes its whole database snapshot under a single
//! well-known key.
//!
//! ## Design Principles
//!
//! - Stores only know `get` and `set` of whole values
//! - No knowledge of snapshot framing, tables or documents
//! - `set` must be atomic per key: a reader observes either the old bytes
//!   or the new bytes, never a torn mix
//!
//! ## Available Stores
//!
//! - [`InMemoryBlobStore`] - For testing and ephemeral sessions
//! - [`FileBlobStore`] - One file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use encounterdb_storage::{BlobStore, InMemoryBlobStore};
//!
//! let mut store = InMemoryBlobStore::new();
//! store.set("snapshot", b"hello world").unwrap();
//! assert_eq!(store.get("snapshot").unwrap().as_deref(), Some(&b"hello world"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::BlobStore;
pub use error::{StorageError, StorageResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
