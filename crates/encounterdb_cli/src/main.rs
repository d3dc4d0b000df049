//! EncounterDB CLI
//!
//! Command-line tools for inspecting and maintaining an EncounterDB store.
//!
//! # Commands
//!
//! - `inspect` - Display snapshot metadata, tables and row counts
//! - `patients` - List patient summaries
//! - `show` - Display one patient's encounter history
//! - `migrate` - Bring an older snapshot up to the current schema
//! - `dump` - Write the raw snapshot bytes to a file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EncounterDB command-line store tools.
#[derive(Parser)]
#[command(name = "encounterdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Key the snapshot is stored under
    #[arg(global = true, short, long)]
    key: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display snapshot metadata, tables and row counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List patients in display order
    Patients {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a patient's encounters, newest first
    Show {
        /// Natural key of the patient
        patient: String,
    },

    /// Apply pending schema revisions
    Migrate {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Write the raw snapshot bytes to a file
    Dump {
        /// Output file
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let key = cli.key.as_deref();
    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, key, &format)?;
        }
        Commands::Patients { format } => {
            let path = cli.path.ok_or("Store path required for patients")?;
            commands::patients::run(&path, key, &format)?;
        }
        Commands::Show { patient } => {
            let path = cli.path.ok_or("Store path required for show")?;
            commands::show::run(&path, key, &patient)?;
        }
        Commands::Migrate { dry_run } => {
            let path = cli.path.ok_or("Store path required for migrate")?;
            commands::migrate::run(&path, key, dry_run)?;
        }
        Commands::Dump { output } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path, key, &output)?;
        }
        Commands::Version => {
            println!("EncounterDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EncounterDB Core v{}", encounterdb_core::VERSION);
            println!(
                "Schema revision {}",
                encounterdb_core::schema::latest_revision()
            );
        }
    }

    Ok(())
}
