//! Patients command implementation.

use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Row {
    key: String,
    demographics: serde_json::Value,
}

/// Lists patient summaries in repository order.
pub fn run(path: &Path, key: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = super::open_repository(path, key)?;
    let patients = repo.list_patient_summaries()?;

    match format {
        "json" => {
            let rows: Vec<_> = patients
                .iter()
                .map(|p| Row {
                    key: p.key.to_string(),
                    demographics: super::document_json(&p.demographics),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            if patients.is_empty() {
                println!("No patients stored.");
            }
            for patient in &patients {
                println!("{:<16} {}", patient.key, patient.demographics);
            }
        }
    }

    Ok(())
}
