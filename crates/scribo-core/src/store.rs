//! Generic key/value persistence. Values are JSON; keys are plain strings.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{self, Validate};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Raw read. A value that is not valid JSON is deleted; any other failure
/// leaves the stored value alone and is returned.
fn read(store: &dyn Store, key: &str) -> Result<Option<Value>, StoreError> {
    match store.get(key) {
        Err(StoreError::Json(e)) => {
            tracing::warn!(key, error = %e, "unparsable stored value, removing");
            discard(store, key);
            Ok(None)
        }
        other => other,
    }
}

/// Read `key` and check it against `T`'s schema. A value that fails to parse
/// or validate is deleted so the next read starts clean; a failed read is
/// logged and the value kept.
pub fn validated_get<T: DeserializeOwned + Validate>(store: &dyn Store, key: &str) -> Option<T> {
    let value = match read(store, key) {
        Ok(value) => value?,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored value");
            return None;
        }
    };
    match schema::parse_value::<T>(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(key, error = %e, "invalid data in storage, removing");
            discard(store, key);
            None
        }
    }
}

/// Like [`validated_get`] for collections: invalid records are dropped one by
/// one and the cleaned collection is written back. A failed read is returned
/// as an error so callers can tell it apart from an absent collection.
pub fn validated_get_records<T>(store: &dyn Store, key: &str) -> Result<Option<Vec<T>>, StoreError>
where
    T: DeserializeOwned + Validate + serde::Serialize,
{
    let Some(value) = read(store, key)? else {
        return Ok(None);
    };
    match schema::parse_records::<T>(value) {
        Ok((records, 0)) => Ok(Some(records)),
        Ok((records, dropped)) => {
            tracing::warn!(key, dropped, "dropped invalid records from storage");
            put(store, key, &records);
            Ok(Some(records))
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "invalid collection in storage, removing");
            discard(store, key);
            Ok(None)
        }
    }
}

/// Serialize and write, logging instead of failing.
pub fn put<T: serde::Serialize>(store: &dyn Store, key: &str, value: &T) {
    let result = serde_json::to_value(value)
        .map_err(StoreError::from)
        .and_then(|json| store.set(key, &json));
    if let Err(e) = result {
        tracing::error!(key, error = %e, "failed to persist value");
    }
}

/// Delete, logging instead of failing.
pub fn discard(store: &dyn Store, key: &str) {
    if let Err(e) = store.delete(key) {
        tracing::error!(key, error = %e, "failed to delete value");
    }
}

// --- In-memory ---

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        // A poisoned map is still a consistent map: every write is a single insert or remove.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries().keys().cloned().collect())
    }
}

// --- Files ---

/// One `<key>.json` file per entry under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Atomic write: temp file, then rename.
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, serde_json::to_string(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut keys: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    return None;
                }
                name.strip_suffix(".json").map(|n| n.to_string())
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisResult, Guideline};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store"));

        assert_eq!(store.get("document").unwrap(), None);
        store.set("document", &json!("Hello")).unwrap();
        store.set("cache-guidelines-abc", &json!({ "a": 1 })).unwrap();

        assert_eq!(store.get("document").unwrap(), Some(json!("Hello")));
        assert_eq!(
            store.keys().unwrap(),
            vec!["cache-guidelines-abc".to_string(), "document".to_string()]
        );

        store.delete("document").unwrap();
        store.delete("document").unwrap();
        assert_eq!(store.get("document").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", &json!(1)),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn unparsable_file_is_removed_on_validated_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(dir.path().join("guidelines.json"), "{not json").unwrap();

        assert_eq!(validated_get_records::<Guideline>(&store, "guidelines").unwrap(), None);
        assert!(!dir.path().join("guidelines.json").exists());
    }

    #[test]
    fn validated_records_are_cleaned_in_place() {
        let store = MemoryStore::new();
        store
            .set(
                "guidelines",
                &json!([
                    { "id": 1, "title": "Good", "description": "" },
                    { "id": 2, "title": "", "description": "untitled" }
                ]),
            )
            .unwrap();

        let records = validated_get_records::<Guideline>(&store, "guidelines").unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            store.get("guidelines").unwrap(),
            Some(json!([{ "id": 1, "title": "Good", "description": "" }]))
        );
    }

    /// Reads fail with an I/O error; writes and deletes reach the inner map.
    struct Unreadable(MemoryStore);

    impl Store for Unreadable {
        fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "device busy")))
        }

        fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
            self.0.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.0.delete(key)
        }

        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.0.keys()
        }
    }

    #[test]
    fn failed_read_keeps_stored_values() {
        let store = Unreadable(MemoryStore::new());
        let result = json!({ "violations": [], "analyzedAt": "2024-05-01T10:00:00.000Z" });
        let rules = json!([{ "id": 1, "title": "Good", "description": "" }]);
        store.set("guidelines-analysis", &result).unwrap();
        store.set("guidelines", &rules).unwrap();

        assert!(validated_get::<AnalysisResult>(&store, "guidelines-analysis").is_none());
        assert!(matches!(
            validated_get_records::<Guideline>(&store, "guidelines"),
            Err(StoreError::Io(_))
        ));

        assert_eq!(store.0.get("guidelines-analysis").unwrap(), Some(result));
        assert_eq!(store.0.get("guidelines").unwrap(), Some(rules));
    }
}
