//! SQLite-backed key-value document store

use crate::StoreError;
use claimline_domain::now_millis;
use claimline_domain::traits::{Document, FieldUpdate, KeyValueStore, PutOutcome};
use claimline_domain::ServiceError;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits on a locked database file before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of [`KeyValueStore`]
///
/// Documents are stored as JSON text. The connection sits behind a mutex so
/// the store can be shared between tasks. Conditional creates rely on the
/// primary key. Field updates take the write lock before reading the
/// document (`BEGIN IMMEDIATE`), so concurrent updates from other
/// connections to the same file wait their turn instead of losing writes.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (or create) a store at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.lock()?.execute_batch(schema)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Count documents whose key starts with `prefix`
    pub fn count_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn read(conn: &Connection, key: &str) -> Result<Option<Document>, StoreError> {
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(doc) => Ok(Some(doc)),
                _ => Err(StoreError::InvalidData(format!(
                    "Document at '{}' is not an object",
                    key
                ))),
            },
            None => Ok(None),
        }
    }

    fn try_put_if_absent(&self, key: &str, doc: Document) -> Result<PutOutcome, StoreError> {
        let body = serde_json::to_string(&doc)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO NOTHING",
            params![key, body, now_millis() as i64],
        )?;

        if inserted == 1 {
            Ok(PutOutcome::Created)
        } else {
            debug!("Conditional create lost for key '{}'", key);
            Ok(PutOutcome::Conflict)
        }
    }

    fn try_put(&self, key: &str, doc: Document) -> Result<(), StoreError> {
        let body = serde_json::to_string(&doc)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key, body, now_millis() as i64],
        )?;
        Ok(())
    }

    fn try_update(&self, key: &str, updates: &[FieldUpdate]) -> Result<Document, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut doc = Self::read(&tx, key)?.unwrap_or_default();
        apply_updates(&mut doc, updates)?;

        let body = serde_json::to_string(&doc)?;
        tx.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key, body, now_millis() as i64],
        )?;
        tx.commit()?;

        Ok(doc)
    }
}

/// Apply field updates to a document in place
pub(crate) fn apply_updates(doc: &mut Document, updates: &[FieldUpdate]) -> Result<(), StoreError> {
    for update in updates {
        match update {
            FieldUpdate::Set(field, value) => {
                doc.insert(field.clone(), value.clone());
            }
            FieldUpdate::SetIfAbsent(field, value) => {
                if !doc.contains_key(field) {
                    doc.insert(field.clone(), value.clone());
                }
            }
            FieldUpdate::AddToSet(field, value) => {
                let entry = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                let items = entry.as_array_mut().ok_or_else(|| {
                    StoreError::InvalidData(format!("Field '{}' is not a set", field))
                })?;
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
        }
    }
    Ok(())
}

impl KeyValueStore for SqliteKvStore {
    fn put_if_absent(&self, key: &str, doc: Document) -> Result<PutOutcome, ServiceError> {
        Ok(self.try_put_if_absent(key, doc)?)
    }

    fn get(&self, key: &str) -> Result<Option<Document>, ServiceError> {
        let conn = self.lock()?;
        Ok(Self::read(&conn, key)?)
    }

    fn put(&self, key: &str, doc: Document) -> Result<(), ServiceError> {
        Ok(self.try_put(key, doc)?)
    }

    fn update(&self, key: &str, updates: &[FieldUpdate]) -> Result<Document, ServiceError> {
        Ok(self.try_update(key, updates)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_put_if_absent_conflicts_on_second_write() {
        let store = SqliteKvStore::in_memory().unwrap();

        let first = store.put_if_absent("k", doc(json!({"v": 1}))).unwrap();
        let second = store.put_if_absent("k", doc(json!({"v": 2}))).unwrap();

        assert_eq!(first, PutOutcome::Created);
        assert_eq!(second, PutOutcome::Conflict);
        assert_eq!(store.get("k").unwrap().unwrap()["v"], json!(1));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = SqliteKvStore::in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_creates_and_preserves_fields() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.put("c", doc(json!({"status": "INTAKE", "link": "a/b"}))).unwrap();

        let updated = store
            .update("c", &[FieldUpdate::set("status", "DENIED")])
            .unwrap();

        assert_eq!(updated["status"], json!("DENIED"));
        assert_eq!(updated["link"], json!("a/b"));

        let created = store
            .update("new", &[FieldUpdate::set_if_absent("status", "INTAKE")])
            .unwrap();
        assert_eq!(created["status"], json!("INTAKE"));
    }

    #[test]
    fn test_set_if_absent_never_overwrites() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.update("c", &[FieldUpdate::set_if_absent("status", "INTAKE")]).unwrap();
        store.update("c", &[FieldUpdate::set("status", "PROCESSING")]).unwrap();

        let after = store
            .update("c", &[FieldUpdate::set_if_absent("status", "INTAKE")])
            .unwrap();
        assert_eq!(after["status"], json!("PROCESSING"));
    }

    #[test]
    fn test_add_to_set_deduplicates() {
        let mut doc = Document::new();
        let updates = [
            FieldUpdate::add_to_set("docs", json!({"id": 1})),
            FieldUpdate::add_to_set("docs", json!({"id": 2})),
            FieldUpdate::add_to_set("docs", json!({"id": 1})),
        ];
        apply_updates(&mut doc, &updates).unwrap();

        assert_eq!(doc["docs"], json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_add_to_set_rejects_scalar_field() {
        let mut doc = Document::new();
        doc.insert("docs".into(), json!("oops"));

        let result = apply_updates(&mut doc, &[FieldUpdate::add_to_set("docs", json!(1))]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_count_prefix() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.put("MAPPING#A", Document::new()).unwrap();
        store.put("MAPPING#B", Document::new()).unwrap();
        store.put("CLAIM#A", Document::new()).unwrap();

        assert_eq!(store.count_prefix("MAPPING#").unwrap(), 2);
        assert_eq!(store.count_prefix("CLAIM#").unwrap(), 1);
        assert_eq!(store.count_prefix("PAYOUT#").unwrap(), 0);
    }

    #[test]
    fn test_updates_from_separate_connections_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.db");
        SqliteKvStore::new(&path).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = SqliteKvStore::new(&path).unwrap();
                    for i in 0..25 {
                        store
                            .update(
                                "CLAIM#A",
                                &[FieldUpdate::add_to_set("docs", json!(writer * 100 + i))],
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let store = SqliteKvStore::new(&path).unwrap();
        let docs = store.get("CLAIM#A").unwrap().unwrap();
        assert_eq!(docs["docs"].as_array().unwrap().len(), 100);
    }
}
