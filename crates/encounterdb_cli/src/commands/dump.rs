//! Dump command implementation.

use std::path::Path;
use tracing::info;

/// Writes the stored snapshot bytes to `output` unchanged.
///
/// The result can be copied into another store directory under the
/// snapshot key and opened directly.
pub fn run(path: &Path, key: Option<&str>, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = super::open_repository(path, key)?;
    let bytes = repo
        .export_snapshot()?
        .ok_or("Snapshot could not be written to the store")?;

    std::fs::write(output, &bytes)?;
    info!("Wrote {} bytes to {:?}", bytes.len(), output);
    println!("✓ Snapshot written to {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
