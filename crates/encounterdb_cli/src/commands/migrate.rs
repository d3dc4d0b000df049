//! Migrate command implementation.

use encounterdb_core::{Engine, EngineHandle, MigrationOperation, MigrationReport, MigrationRunner};
use encounterdb_storage::BlobStore;
use std::path::Path;
use tracing::info;

/// Brings the stored snapshot up to the current schema revision.
pub fn run(path: &Path, key: Option<&str>, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running migrations for {:?}", path);

    let store = super::open_store(path)?;
    let config = super::config(key);
    let runner = MigrationRunner::current();

    let Some(bytes) = store.get(&config.snapshot_key)? else {
        if dry_run {
            println!(
                "Dry run - no snapshot stored, would create a fresh revision {} schema",
                runner.latest()
            );
            return Ok(());
        }
        persist(EngineHandle::with_runner(store, config, runner))?;
        println!("✓ Created fresh schema at revision {}", runner.latest());
        return Ok(());
    };

    let mut engine = Engine::decode(&bytes)?;
    let report = runner.ensure_schema(&mut engine)?;

    if !report.changed() {
        println!("✓ No pending migrations to run.");
        return Ok(());
    }

    if dry_run {
        println!("Dry run - would apply {} change(s):", report.applied.len());
        print_changes(&report);
        return Ok(());
    }

    println!("Running {} change(s)...", report.applied.len());
    persist(EngineHandle::with_runner(store, config, runner))?;
    print_changes(&report);
    println!(
        "\n✓ Successfully migrated from revision {} to {}",
        report.from_revision, report.to_revision
    );

    Ok(())
}

fn persist<S: BlobStore>(mut handle: EngineHandle<S>) -> Result<(), Box<dyn std::error::Error>> {
    handle.initialize()?;
    if handle.is_dirty() {
        return Err("Migrated snapshot could not be written".into());
    }
    Ok(())
}

fn print_changes(report: &MigrationReport) {
    for change in &report.applied {
        match &change.operation {
            MigrationOperation::CreateTable { table } => {
                println!("  r{} {}: create table {}", change.revision, change.name, table);
            }
            MigrationOperation::AddColumn { table, column } => {
                println!(
                    "  r{} {}: add column {}.{}",
                    change.revision, change.name, table, column
                );
            }
        }
    }
    if report.applied.is_empty() {
        println!(
            "  revision number {} -> {}",
            report.from_revision, report.to_revision
        );
    }
}
