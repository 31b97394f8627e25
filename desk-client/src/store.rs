//! Persistent session store.
//!
//! Entries are string-keyed strings, like browser local storage: `token` is
//! the raw bearer string, `user` and `currentCompany` are JSON documents.
//!
//! Every mutation goes through [`SessionStore::apply`] with a [`StoreBatch`].
//! A batch is applied as one unit, so no reader ever sees a token without its
//! user, or a half-cleared session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const CURRENT_COMPANY_KEY: &str = "currentCompany";

/// Every key that belongs to a session.
pub const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, CURRENT_COMPANY_KEY];

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Remove { key: String },
}

/// An ordered set of writes applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    ops: Vec<StoreOp>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(StoreOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(StoreOp::Remove { key: key.into() });
        self
    }

    /// Remove every session key.
    pub fn clear_session() -> Self {
        SESSION_KEYS
            .iter()
            .fold(Self::new(), |batch, key| batch.remove(*key))
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    fn apply_to(&self, map: &mut HashMap<String, String>) {
        for op in &self.ops {
            match op {
                StoreOp::Set { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
                StoreOp::Remove { key } => {
                    map.remove(key);
                }
            }
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Apply all operations of `batch` as one unit.
    fn apply(&self, batch: StoreBatch) -> StoreResult<()>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.apply(StoreBatch::new().set(key, value))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.apply(StoreBatch::new().remove(key))
    }

    fn clear_session(&self) -> StoreResult<()> {
        self.apply(StoreBatch::clear_session())
    }
}

/// In-process store. Lives as long as the process does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().unwrap().clone()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn apply(&self, batch: StoreBatch) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        batch.apply_to(&mut entries);
        Ok(())
    }
}

/// Store backed by one JSON object on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so the file always holds a complete batch. An unreadable file is treated
/// as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> HashMap<String, String> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "session file unreadable; starting empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "session file corrupt; starting empty");
                HashMap::new()
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "session file written");
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn apply(&self, batch: StoreBatch) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        let mut next = entries.clone();
        batch.apply_to(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_applies_in_order() {
        let store = MemoryStore::new();
        store
            .apply(StoreBatch::new().set("a", "1").set("a", "2").remove("b").set("b", "3"))
            .unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn clear_session_only_touches_session_keys() {
        let store = MemoryStore::with_entries([
            (TOKEN_KEY, "t"),
            (USER_KEY, "{}"),
            (CURRENT_COMPANY_KEY, "{}"),
            ("theme", "dark"),
        ]);
        store.clear_session().unwrap();

        let left = store.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path);
        store
            .apply(StoreBatch::new().set(TOKEN_KEY, "abc").set(USER_KEY, r#"{"id":"u1"}"#))
            .unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get(USER_KEY).unwrap().as_deref(), Some(r#"{"id":"u1"}"#));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(FileStore::open(&path).get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }
}
