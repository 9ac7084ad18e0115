/// Local key-value storage for persisted learner state.
///
/// Plays the role browser local storage plays for a web client: string values under
/// string keys, one origin per store. Two backends:
/// - `FileStore`: one `{key}.json` file per key under a directory, written via a
///   temporary file and an atomic rename.
/// - `MemoryStore`: process-local map with an optional byte quota, used in tests and
///   for ephemeral sessions.
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::CommonError;

pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, CommonError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CommonError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), CommonError>;
}

/// Keys become file names, so they are limited to a conservative character set.
pub fn validate_key(key: &str) -> Result<(), CommonError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CommonError::InvalidKey(key.to_string()))
    }
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CommonError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CommonError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CommonError::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CommonError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let temp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        fs::rename(&temp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CommonError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CommonError::Io(e)),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once the total of all values would exceed
    /// `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Poisoning cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CommonError> {
        validate_key(key)?;
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CommonError> {
        validate_key(key)?;
        let mut entries = self.entries();
        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + value.len();
            if needed > quota {
                return Err(CommonError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CommonError> {
        validate_key(key)?;
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(validate_key("learningPathway_userData").is_ok());
        assert!(validate_key("user-data.v1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
    }

    #[test]
    fn file_store_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("userData").unwrap(), None);

        store.set("userData", r#"{"a":1}"#).unwrap();
        store.set("userData", r#"{"a":2}"#).unwrap();
        assert_eq!(store.get("userData").unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert!(dir.path().join("nested").join("userData.json").exists());
        assert!(!dir.path().join("nested").join("userData.json.tmp").exists());

        store.remove("userData").unwrap();
        store.remove("userData").unwrap();
        assert_eq!(store.get("userData").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let err = store.set("../outside", "x").unwrap_err();
        assert!(matches!(err, CommonError::InvalidKey(_)));
    }

    #[test]
    fn memory_store_enforces_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "12345").unwrap();
        // Replacing a key only counts the new value.
        store.set("a", "1234567890").unwrap();

        let err = store.set("b", "x").unwrap_err();
        match err {
            CommonError::QuotaExceeded { key, needed, quota } => {
                assert_eq!(key, "b");
                assert_eq!(needed, 11);
                assert_eq!(quota, 10);
            }
            other => panic!("expected quota error, got {other:?}"),
        }
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1234567890"));
    }
}
