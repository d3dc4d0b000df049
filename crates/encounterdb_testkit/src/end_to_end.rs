//! End-to-end scenarios across storage, codec and core.

use crate::prelude::*;
use encounterdb_codec::Document;
use encounterdb_core::schema::{records, CLINICAL_RECORDS, REVISIONS};
use encounterdb_core::{
    Config, CoreError, Engine, EngineHandle, MigrationRunner, NewEncounter, RecordRepository,
    UpdateOutcome, DEFAULT_SNAPSHOT_KEY,
};
use encounterdb_storage::{BlobStore, InMemoryBlobStore};
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn reload_reports_identical_results(ops in operation_sequence_strategy(1, 24)) {
        let mut test = TestRepository::memory();
        let mut harness = RepositoryHarness::new();
        harness.apply_all(&mut test.repo, &ops).unwrap();
        let before = observe(&mut test.repo).unwrap();

        let mut reopened = test.reopen();
        let after = observe(&mut reopened.repo).unwrap();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn any_truncation_falls_back_to_fresh(cut in 0usize..4096) {
        let test = scenarios::populated_repository(2, 2);
        let bytes = test.stored_snapshot().unwrap();
        let cut = cut % bytes.len();

        let store = InMemoryBlobStore::with_entry(DEFAULT_SNAPSHOT_KEY, bytes[..cut].to_vec());
        let mut fresh = TestRepository::over(store, Config::default());
        prop_assert!(fresh.list_patient_summaries().unwrap().is_empty());
    }
}

#[test]
fn history_is_newest_first() {
    let mut test = TestRepository::memory();
    let key = patient_key("30111222");
    let t1 = test.insert_clinical_record(&key, samples::encounter("Ana")).unwrap();
    let t2 = test.insert_clinical_record(&key, samples::encounter("Ana")).unwrap();
    let t3 = test.insert_clinical_record(&key, samples::encounter("Ana")).unwrap();

    let detail = test.get_patient_detail(&key).unwrap().unwrap();
    let ids: Vec<_> = detail.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![t3, t2, t1]);
    assert!(detail.records[0].created_at > detail.records[2].created_at);
}

#[test]
fn second_migration_adds_nothing_and_writes_nothing() {
    let store = CountingBlobStore::new(InMemoryBlobStore::new());
    let counters = store.counters();
    let mut handle = EngineHandle::new(store, Config::default());
    handle.initialize().unwrap();
    assert_eq!(counters.sets(), 1);

    let first = handle.ensure_schema().unwrap();
    let second = handle.ensure_schema().unwrap();
    assert!(!first.changed());
    assert!(second.applied.is_empty());
    assert_eq!(counters.sets(), 1);

    let reopened_store = CountingBlobStore::new(handle.into_store().into_inner());
    let reopened_counters = reopened_store.counters();
    let mut reopened = EngineHandle::new(reopened_store, Config::default());
    reopened.initialize().unwrap();
    assert_eq!(reopened_counters.sets(), 0);
}

#[test]
fn reads_never_write() {
    let store = CountingBlobStore::new(InMemoryBlobStore::new());
    let counters = store.counters();
    let mut repo = RecordRepository::new(store, Config::default());
    repo.insert_clinical_record(&patient_key("1"), samples::encounter("Ana"))
        .unwrap();
    let writes = counters.sets();

    repo.list_patient_summaries().unwrap();
    repo.get_patient_detail(&patient_key("1")).unwrap();
    repo.get_patient_detail(&patient_key("2")).unwrap();
    assert_eq!(counters.sets(), writes);
}

#[test]
fn every_mutation_flushes_once() {
    let store = CountingBlobStore::new(InMemoryBlobStore::new());
    let counters = store.counters();
    let mut repo = RecordRepository::new(store, Config::default());

    let id = repo
        .insert_clinical_record(&patient_key("1"), samples::encounter("Ana"))
        .unwrap();
    assert_eq!(counters.sets(), 2);
    repo.update_summary(id, "revisado").unwrap();
    assert_eq!(counters.sets(), 3);
    repo.update_summary(missing_id(), "x").unwrap();
    assert_eq!(counters.sets(), 3);
}

fn missing_id() -> encounterdb_core::RecordId {
    encounterdb_core::RecordId::new(9_999)
}

#[test]
fn upsert_keeps_single_patient() {
    let mut test = TestRepository::memory();
    let key = patient_key("27444555");
    test.insert_clinical_record(&key, samples::encounter("Old Name"))
        .unwrap();
    test.insert_clinical_record(&key, samples::encounter("New Name"))
        .unwrap();

    let summaries = test.list_patient_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].demographics, samples::demographics("New Name"));
    assert_eq!(test.get_patient_detail(&key).unwrap().unwrap().records.len(), 2);
}

#[test]
fn column_update_is_isolated() {
    let mut test = TestRepository::memory();
    let key = patient_key("1");
    let id = test.insert_clinical_record(&key, samples::encounter("Ana")).unwrap();
    let other = test.insert_clinical_record(&key, samples::encounter("Ana")).unwrap();
    let before = test.get_record(id).unwrap().unwrap();
    let other_before = test.get_record(other).unwrap().unwrap();

    assert_eq!(
        test.update_classification_profile(id, samples::classification_profile())
            .unwrap(),
        UpdateOutcome::Updated
    );

    let after = test.get_record(id).unwrap().unwrap();
    assert_eq!(after.classification_profile, Some(samples::classification_profile()));
    assert_eq!(after.anamnesis.as_str(), before.anamnesis.as_str());
    assert_eq!(after.physical_exam.as_str(), before.physical_exam.as_str());
    assert_eq!(after.scales.as_str(), before.scales.as_str());
    assert_eq!(after.imaging.as_str(), before.imaging.as_str());
    assert_eq!(after.impact, before.impact);
    assert_eq!(after.summary, before.summary);
    assert_eq!(after.hypothesis_comparison, before.hypothesis_comparison);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(test.get_record(other).unwrap().unwrap(), other_before);
}

#[test]
fn fresh_store_writes_snapshot() {
    let mut test = TestRepository::memory();
    assert!(test.stored_snapshot().is_none());
    assert!(test.list_patient_summaries().unwrap().is_empty());

    let engine = Engine::decode(&test.stored_snapshot().unwrap()).unwrap();
    assert_eq!(engine.revision(), 4);
}

#[test]
fn old_snapshot_upgrades_and_accepts_new_columns() {
    let store = InMemoryBlobStore::new();
    let old_runner = MigrationRunner::new(&REVISIONS[..2]);
    let mut old = RecordRepository::from_handle(EngineHandle::with_runner(
        store.clone(),
        Config::default(),
        old_runner,
    ));
    let key = patient_key("1");
    let id = old
        .insert_clinical_record(&key, NewEncounter::new(samples::demographics("Ana")))
        .unwrap();
    let old_columns = Engine::decode(&store.get(DEFAULT_SNAPSHOT_KEY).unwrap().unwrap())
        .unwrap()
        .column_names(CLINICAL_RECORDS)
        .unwrap();
    assert!(!old_columns.contains(&records::HYPOTHESIS_COMPARISON.to_string()));

    let mut current = TestRepository::over(store, Config::default());
    let record = current.get_record(id).unwrap().unwrap();
    assert!(record.hypothesis_comparison.is_none());
    assert!(record.impact.is_none());

    assert_eq!(
        current
            .update_hypothesis_comparison(id, samples::hypothesis_comparison())
            .unwrap(),
        UpdateOutcome::Updated
    );
    let mut reopened = current.reopen();
    assert_eq!(
        reopened.get_record(id).unwrap().unwrap().hypothesis_comparison,
        Some(samples::hypothesis_comparison())
    );
}

#[test]
fn truncated_snapshot_starts_fresh() {
    let test = scenarios::populated_repository(3, 1);
    let bytes = test.stored_snapshot().unwrap();
    test.store()
        .put_raw(DEFAULT_SNAPSHOT_KEY, bytes[..bytes.len() - 7].to_vec());

    let mut reopened = test.reopen();
    assert!(reopened.list_patient_summaries().unwrap().is_empty());
    let rewritten = reopened.stored_snapshot().unwrap();
    assert!(Engine::decode(&rewritten).is_ok());
}

#[test]
fn truncated_snapshot_reported_when_not_discarding() {
    let test = scenarios::populated_repository(1, 1);
    let bytes = test.stored_snapshot().unwrap();
    let store = InMemoryBlobStore::with_entry(DEFAULT_SNAPSHOT_KEY, bytes[..10].to_vec());

    let result = RecordRepository::open(store, Config::default().discard_corrupt_snapshot(false));
    assert!(matches!(result, Err(CoreError::Corrupted { .. })));
}

#[test]
fn write_failure_is_visible_and_retried() {
    let store = FailingBlobStore::new(InMemoryBlobStore::new());
    let switch = store.switch();
    let mut repo = RecordRepository::new(store, Config::default());
    repo.list_patient_summaries().unwrap();

    switch.fail_sets(true);
    let err = repo
        .insert_clinical_record(&patient_key("1"), samples::encounter("Ana"))
        .unwrap_err();
    assert!(matches!(err, CoreError::FlushFailed { .. }));
    assert!(repo.handle().is_dirty());

    switch.heal();
    repo.insert_clinical_record(&patient_key("2"), samples::encounter("Bea"))
        .unwrap();

    let inner = repo.into_handle().into_store().into_inner();
    let mut reopened = RecordRepository::new(inner, Config::default());
    assert_eq!(reopened.list_patient_summaries().unwrap().len(), 2);
}

#[test]
fn read_failure_propagates_and_retries_init() {
    let store = FailingBlobStore::new(InMemoryBlobStore::new());
    let switch = store.switch();
    switch.fail_gets(true);
    let mut repo = RecordRepository::new(store, Config::default());

    assert!(matches!(
        repo.list_patient_summaries(),
        Err(CoreError::Storage(_))
    ));
    assert!(!repo.handle().is_ready());

    switch.heal();
    assert!(repo.list_patient_summaries().unwrap().is_empty());
}

#[test]
fn export_matches_stored_bytes() {
    let mut test = scenarios::populated_repository(2, 1);
    let exported = test.export_snapshot().unwrap().unwrap();
    assert_eq!(Some(exported.clone()), test.stored_snapshot());

    let copy = InMemoryBlobStore::with_entry(DEFAULT_SNAPSHOT_KEY, exported);
    let mut restored = TestRepository::over(copy, Config::default());
    assert_eq!(
        observe(&mut restored.repo).unwrap(),
        observe(&mut test.repo).unwrap()
    );
}

#[test]
fn custom_snapshot_key_is_used() {
    let config = Config::default().snapshot_key("other_db");
    let mut test = TestRepository::with_config(config);
    test.list_patient_summaries().unwrap();
    assert!(test.store().get("other_db").unwrap().is_some());
    assert!(test.store().get(DEFAULT_SNAPSHOT_KEY).unwrap().is_none());
}

#[test]
fn documents_keep_their_bytes() {
    let mut test = TestRepository::memory();
    let raw = r#"{ "spacing" :  "kept",  "n":1 }"#;
    let mut encounter = samples::encounter("Ana");
    encounter.anamnesis = Document::from_json(raw).unwrap();
    let id = test.insert_clinical_record(&patient_key("1"), encounter).unwrap();

    let mut reopened = test.reopen();
    assert_eq!(reopened.get_record(id).unwrap().unwrap().anamnesis.as_str(), raw);
}

#[test]
fn file_store_round_trip() {
    let mut test = TestFileRepository::new();
    let id = test
        .insert_clinical_record(&patient_key("1"), samples::encounter("Ana"))
        .unwrap();
    test.update_summary(id, "alta").unwrap();
    assert!(test.path().join(DEFAULT_SNAPSHOT_KEY).exists());

    let mut test = test.reopen();
    let record = test.get_record(id).unwrap().unwrap();
    assert_eq!(record.summary_text().as_deref(), Some("alta"));
}
