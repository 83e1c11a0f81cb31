use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

use super::{Record, StoreError};

/// Local key-value fallback: one JSON blob per collection, keyed by a fixed
/// string, stored in a single SQLite table.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open (or create) the store at `path` and initialize the schema
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let store = LocalStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Throwaway store, used by tests and `--dev` experiments
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = LocalStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Raw value stored under `key`
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a key; returns whether it existed
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
        Ok(removed > 0)
    }

    /// Load a whole collection. `Ok(None)` means the key was never written.
    pub fn load<R: Record>(&self) -> Result<Option<Vec<R>>, StoreError> {
        let Some(raw) = self.get_raw(R::COLLECTION)? else {
            return Ok(None);
        };
        serde_json::from_str::<Vec<R>>(&raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: R::COLLECTION.to_string(),
                reason: e.to_string(),
            })
    }

    /// Replace a whole collection
    pub fn store<R: Record>(&self, records: &[R]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.put_raw(R::COLLECTION, &raw)
    }

    /// Id set stored under `key`; a missing key is an empty set
    pub fn load_ids(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(BTreeSet::new());
        };
        serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the id set under `key`; an empty set removes the key
    pub fn store_ids(&self, key: &str, ids: &BTreeSet<String>) -> Result<(), StoreError> {
        if ids.is_empty() {
            self.remove(key)?;
            return Ok(());
        }
        self.put_raw(key, &serde_json::to_string(ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Task};

    fn sample_task(id: &str) -> Task {
        let mut task = Task::new(
            "Water plants".to_string(),
            Category::Personal,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        );
        task.id = id.to_string();
        task
    }

    #[test]
    fn missing_collection_is_none() {
        let store = LocalStore::in_memory().unwrap();
        assert!(store.load::<Task>().unwrap().is_none());
    }

    #[test]
    fn store_then_load_collection() {
        let store = LocalStore::in_memory().unwrap();
        let tasks = vec![sample_task("a"), sample_task("b")];
        store.store(&tasks).unwrap();
        assert_eq!(store.load::<Task>().unwrap(), Some(tasks));
    }

    #[test]
    fn collection_is_a_json_blob_under_a_fixed_key() {
        let store = LocalStore::in_memory().unwrap();
        store.store(&[sample_task("a")]).unwrap();
        let raw = store.get_raw("dayboard.tasks").unwrap().unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.contains("\"startDate\":\"2024-06-10\""));
    }

    #[test]
    fn malformed_blob_is_reported() {
        let store = LocalStore::in_memory().unwrap();
        store.put_raw("dayboard.tasks", "{not json").unwrap();
        assert!(matches!(
            store.load::<Task>(),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let store = LocalStore::in_memory().unwrap();
        store.put_raw("dayboard.tasks", r#"[{"id":"x"}]"#).unwrap();
        assert!(matches!(
            store.load::<Task>(),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn put_overwrites_and_remove_reports() {
        let store = LocalStore::in_memory().unwrap();
        store.put_raw("k", "1").unwrap();
        store.put_raw("k", "2").unwrap();
        assert_eq!(store.get_raw("k").unwrap().as_deref(), Some("2"));
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn id_sets_round_trip_and_empty_sets_are_removed() {
        let store = LocalStore::in_memory().unwrap();
        assert!(store.load_ids("dayboard.tasks.unsynced").unwrap().is_empty());

        let ids: BTreeSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        store.store_ids("dayboard.tasks.unsynced", &ids).unwrap();
        assert_eq!(store.load_ids("dayboard.tasks.unsynced").unwrap(), ids);

        store.store_ids("dayboard.tasks.unsynced", &BTreeSet::new()).unwrap();
        assert!(store.get_raw("dayboard.tasks.unsynced").unwrap().is_none());
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("dayboard.db");
        let store = LocalStore::open(&path).unwrap();
        store.put_raw("k", "v").unwrap();
        assert!(path.exists());
    }
}
