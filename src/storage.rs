use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::StorageError;

/// Local key-value storage. Values are JSON-encoded strings.
///
/// Writes are last-write-wins; callers never merge.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// On-device store backed by a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Rc<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened local storage");
        Self::init(conn)
    }

    /// Open the database at the default per-user location.
    pub fn open_default() -> Result<Self, StorageError> {
        let path = Self::default_path()
            .ok_or_else(|| StorageError::Unavailable("no home directory".to_string()))?;
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn default_path() -> Option<PathBuf> {
        AppDirs::storage_path()
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self {
            conn: Rc::new(conn),
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Whichever backend the application ended up with.
#[derive(Debug, Clone)]
pub enum LocalStorage {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl LocalStorage {
    /// Open the on-disk store, degrading to memory when it is unavailable.
    pub fn open_or_memory(path: Option<&Path>) -> Self {
        let opened = match path {
            Some(p) => SqliteStore::open(p),
            None => SqliteStore::open_default(),
        };
        match opened {
            Ok(store) => Self::Sqlite(store),
            Err(err) => {
                tracing::warn!(%err, "local storage unavailable, progress will not be saved");
                Self::Memory(MemoryStore::default())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Sqlite(s) => s.get(key),
            Self::Memory(m) => m.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(s) => s.set(key, value),
            Self::Memory(m) => m.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(s) => s.remove(key),
            Self::Memory(m) => m.remove(key),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Store whose every operation fails, like disabled browser storage.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let a = MemoryStore::default();
        let b = a.clone();

        a.set("k", "1").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("1"));

        b.remove("k").unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_sqlite_set_get_remove() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert_eq!(store.get("missing").unwrap(), None);

        store.set("k", "\"first\"").unwrap();
        store.set("k", "\"second\"").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("\"second\""));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_sqlite_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.db");

        SqliteStore::open(&path).unwrap().set("k", "42").unwrap();
        let reopened = SqliteStore::open(&path).unwrap();

        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_local_storage_falls_back_to_memory() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let storage = LocalStorage::open_or_memory(Some(dir.path()));

        assert!(!storage.is_persistent());
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }
}
