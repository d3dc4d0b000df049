//! Blob store trait definition.

use crate::error::StorageResult;

/// A durable, key-addressed byte store.
///
/// Blob stores are **opaque**. EncounterDB owns all interpretation of the
/// bytes; a store only keeps whole values under string keys.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful `set` for that key
/// - `get` of a key that was never set returns `Ok(None)`
/// - `set` is atomic from the caller's point of view: after a failed or
///   interrupted `set`, `get` returns the previous value (or `None`)
///
/// There are no transactions and no partial writes. Any store wired into
/// EncounterDB must uphold the atomicity requirement itself.
///
/// # Implementors
///
/// - [`super::InMemoryBlobStore`] - For testing
/// - [`super::FileBlobStore`] - For persistent storage
pub trait BlobStore: Send {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be made durable, for example
    /// because a quota was exceeded. The previous value stays readable.
    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }
}
