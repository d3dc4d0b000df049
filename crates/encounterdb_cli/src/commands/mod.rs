//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod migrate;
pub mod patients;
pub mod show;

use encounterdb_core::{Config, RecordRepository};
use encounterdb_storage::FileBlobStore;
use std::path::Path;

/// Configuration used by every command.
///
/// Tools never discard an unreadable snapshot; they report it instead.
pub fn config(key: Option<&str>) -> Config {
    let config = Config::default().discard_corrupt_snapshot(false);
    match key {
        Some(key) => config.snapshot_key(key),
        None => config,
    }
}

/// Opens the store directory, failing if it does not exist.
pub fn open_store(path: &Path) -> Result<FileBlobStore, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No store found at {:?}", path).into());
    }
    Ok(FileBlobStore::open(path)?)
}

/// Opens a repository over the store directory.
pub fn open_repository(
    path: &Path,
    key: Option<&str>,
) -> Result<RecordRepository<FileBlobStore>, Box<dyn std::error::Error>> {
    Ok(RecordRepository::open(open_store(path)?, config(key))?)
}

/// Converts a stored document to JSON for output, keeping raw text if it
/// does not parse.
pub fn document_json(document: &encounterdb_codec::Document) -> serde_json::Value {
    document
        .to_value()
        .unwrap_or_else(|_| serde_json::Value::String(document.as_str().to_string()))
}
