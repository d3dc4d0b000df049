//! File-based blob store for persistent storage.

use crate::backend::BlobStore;
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix of the staging file written before the atomic rename.
const TEMP_SUFFIX: &str = ".tmp";

/// A directory-backed blob store: one file per key.
///
/// # Durability
///
/// `set` uses the write-then-rename pattern:
/// 1. Write the value to `<key>.tmp`
/// 2. Sync the staging file to disk
/// 3. Rename it over `<key>`
/// 4. Sync the directory so the rename itself is durable
///
/// A crash at any point leaves either the old file or the new one in place.
/// If the write or rename fails, the staging file is removed.
///
/// # Example
///
/// ```no_run
/// use encounterdb_storage::{BlobStore, FileBlobStore};
/// use std::path::Path;
///
/// let mut store = FileBlobStore::open(Path::new("data")).unwrap();
/// store.set("snapshot", b"persistent data").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path that holds `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` cannot be mapped to a single file name.
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.root)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata updates
        Ok(())
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains(['/', '\\']) {
        "key contains a path separator"
    } else if key.starts_with('.') {
        "key starts with '.'"
    } else if key.ends_with(TEMP_SUFFIX) {
        "key uses the reserved staging suffix"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let temp_path = self.root.join(format!("{key}{TEMP_SUFFIX}"));

        let staged = write_synced(&temp_path, value).and_then(|()| fs::rename(&temp_path, &path));
        if let Err(e) = staged {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        self.sync_directory()
    }
}

fn write_synced(path: &Path, value: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value)?;
    file.sync_all()
}
