//! Integration tests for claimline-store

use claimline_domain::traits::{FieldUpdate, KeyValueStore, PutOutcome};
use claimline_store::SqliteKvStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("claims.db");

    {
        let store = SqliteKvStore::new(&db_path).unwrap();
        store
            .update("CLAIM#1", &[FieldUpdate::set("status", "INTAKE")])
            .unwrap();
    }

    let reopened = SqliteKvStore::new(&db_path).unwrap();
    let doc = reopened.get("CLAIM#1").unwrap().unwrap();
    assert_eq!(doc["status"], json!("INTAKE"));
}

#[test]
fn test_concurrent_conditional_creates_have_one_winner() {
    let store = Arc::new(SqliteKvStore::in_memory().unwrap());

    let outcomes: Vec<PutOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    let doc = json!({ "writer": i }).as_object().cloned().unwrap();
                    store.put_if_absent("MAPPING#CLM-1", doc).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let created = outcomes.iter().filter(|o| **o == PutOutcome::Created).count();
    assert_eq!(created, 1);
    assert_eq!(store.count_prefix("MAPPING#").unwrap(), 1);
}

#[test]
fn test_concurrent_appends_are_not_lost() {
    let store = Arc::new(SqliteKvStore::in_memory().unwrap());

    std::thread::scope(|scope| {
        for i in 0..10 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                store
                    .update(
                        "CLAIM#1",
                        &[
                            FieldUpdate::set_if_absent("status", "INTAKE"),
                            FieldUpdate::add_to_set("received_documents", json!({ "doc_id": i })),
                        ],
                    )
                    .unwrap();
            });
        }
    });

    let doc = store.get("CLAIM#1").unwrap().unwrap();
    assert_eq!(doc["received_documents"].as_array().unwrap().len(), 10);
    assert_eq!(doc["status"], json!("INTAKE"));
}
