//! Inspect command implementation.

use encounterdb_codec::read_header;
use encounterdb_core::{schema, Engine, MigrationRunner};
use encounterdb_storage::BlobStore;
use serde::Serialize;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Snapshot key.
    pub key: String,
    /// Whole snapshot size in bytes.
    pub snapshot_size: usize,
    /// Frame format version.
    pub format_version: u16,
    /// CBOR payload size in bytes.
    pub payload_size: u32,
    /// Schema revision recorded in the snapshot.
    pub revision: u32,
    /// Newest revision this build knows.
    pub latest_revision: u32,
    /// Revisions with changes not yet applied.
    pub pending: Vec<u32>,
    /// Per-table statistics.
    pub tables: Vec<TableStats>,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: String,
    /// Physical columns in order.
    pub columns: Vec<String>,
    /// Number of rows.
    pub rows: usize,
    /// Next autoincrement value, for autoincrement tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_rowid: Option<i64>,
}

/// Runs the inspect command.
///
/// Reads the snapshot without migrating it, so nothing is written.
pub fn run(path: &Path, key: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(path)?;
    let config = super::config(key);
    let bytes = store
        .get(&config.snapshot_key)?
        .ok_or_else(|| format!("No snapshot stored under {:?}", config.snapshot_key))?;

    let header = read_header(&bytes)?;
    let engine = Engine::decode(&bytes)?;

    let result = InspectResult {
        path: path.display().to_string(),
        key: config.snapshot_key.clone(),
        snapshot_size: bytes.len(),
        format_version: header.version,
        payload_size: header.payload_len,
        revision: engine.revision(),
        latest_revision: schema::latest_revision(),
        pending: MigrationRunner::current().pending(&engine),
        tables: engine
            .tables()
            .map(|table| TableStats {
                name: table.name().to_string(),
                columns: table.column_names().into_iter().map(String::from).collect(),
                rows: table.len(),
                next_rowid: table.is_autoincrement().then(|| table.next_rowid()),
            })
            .collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("EncounterDB Snapshot Inspection");
    println!("===============================");
    println!();
    println!("Path: {}", result.path);
    println!("Key:  {}", result.key);
    println!();
    println!("Snapshot:");
    println!("  Size:           {} bytes", format_size(result.snapshot_size));
    println!("  Frame version:  {}", result.format_version);
    println!("  Payload:        {} bytes", format_size(result.payload_size as usize));
    println!(
        "  Revision:       {} (latest {})",
        result.revision, result.latest_revision
    );
    if !result.pending.is_empty() {
        println!("  Pending:        {:?}", result.pending);
    }

    for table in &result.tables {
        println!();
        println!("Table {}:", table.name);
        println!("  Rows:    {}", table.rows);
        if let Some(next) = table.next_rowid {
            println!("  Next id: {}", next);
        }
        println!("  Columns: {}", table.columns.join(", "));
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
