//! Show command implementation.

use encounterdb_core::{ClinicalRecord, PatientKey};
use serde_json::{json, Value};
use std::path::Path;

/// Prints one patient's demographics and encounters as JSON.
pub fn run(path: &Path, key: Option<&str>, patient: &str) -> Result<(), Box<dyn std::error::Error>> {
    let patient = PatientKey::new(patient)?;
    let mut repo = super::open_repository(path, key)?;

    let detail = repo
        .get_patient_detail(&patient)?
        .ok_or_else(|| format!("No patient with key {}", patient))?;

    let output = json!({
        "key": patient.as_str(),
        "demographics": super::document_json(&detail.demographics),
        "records": detail.records.iter().map(render).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn render(record: &ClinicalRecord) -> Value {
    let optional = |doc: &Option<encounterdb_codec::Document>| {
        doc.as_ref().map_or(Value::Null, super::document_json)
    };
    json!({
        "id": record.id.as_i64(),
        "created_at": record.created_at,
        "anamnesis": super::document_json(&record.anamnesis),
        "physical_exam": super::document_json(&record.physical_exam),
        "scales": super::document_json(&record.scales),
        "imaging": super::document_json(&record.imaging),
        "impact": optional(&record.impact),
        "summary": optional(&record.summary),
        "classification_profile": optional(&record.classification_profile),
        "hypothesis_comparison": optional(&record.hypothesis_comparison),
    })
}
