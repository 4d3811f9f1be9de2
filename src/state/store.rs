use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::scene::Scene;

/// Key under which the whole scene is saved
pub const SCENE_KEY: &str = "savedImages";

/// Errors raised by a persistence backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine user data directory")]
    NoDataDir,
}

/// Minimal synchronous key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// SQLite-backed key-value store.
///
/// The database file lives in the user's data directory by default:
/// - Linux: ~/.local/share/pinboard/pinboard.db
/// - macOS: ~/Library/Application Support/pinboard/pinboard.db
/// - Windows: %APPDATA%\pinboard\pinboard.db
pub struct SqliteStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open the store at its default location
    pub fn open_default() -> Result<Self, StoreError> {
        let path = Self::default_db_path().ok_or(StoreError::NoDataDir)?;
        Self::open(&path)
    }

    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        log::info!("📁 Scene store opened at: {}", path.display());

        let store = SqliteStore {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Throwaway store, used when the real one cannot be opened and in tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn default_db_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("pinboard");
        path.push("pinboard.db");
        Some(path)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key     TEXT PRIMARY KEY,
                value   BLOB NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Path to the database file (`None` when in memory)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// HashMap-backed store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_vec());
        self.writes += 1;
        Ok(())
    }
}

/// Persistence context shared by the scene owner and the interaction
/// controller: loads the scene once at startup, writes it back on every
/// committed change.
#[derive(Debug)]
pub struct SceneStore<S> {
    store: S,
}

impl<S: KeyValueStore> SceneStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the saved scene, or an empty one when nothing usable is stored
    pub fn init(&self) -> Scene {
        match self.store.get(SCENE_KEY) {
            Ok(Some(bytes)) => {
                let scene = Scene::deserialize(&bytes);
                log::info!("🖼️  Restored scene with {} images", scene.len());
                scene
            }
            Ok(None) => {
                log::info!("No saved scene, starting empty");
                Scene::new()
            }
            Err(e) => {
                log::warn!("⚠️  Could not read saved scene, starting empty: {}", e);
                Scene::new()
            }
        }
    }

    /// Save the whole scene. Failures are logged and swallowed; returns
    /// whether the write went through.
    pub fn flush(&mut self, scene: &Scene) -> bool {
        let bytes = match scene.serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("❌ Could not serialize scene: {}", e);
                return false;
            }
        };

        match self.store.set(SCENE_KEY, &bytes) {
            Ok(()) => {
                log::debug!("Saved scene ({} images, {} bytes)", scene.len(), bytes.len());
                true
            }
            Err(e) => {
                log::error!("❌ Could not save scene: {}", e);
                false
            }
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Payload;

    /// Store whose writes always fail
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::NoDataDir)
        }

        fn set(&mut self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::NoDataDir)
        }
    }

    #[test]
    fn test_sqlite_get_missing_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("nothing").unwrap(), None);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_sqlite_set_overwrites() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set(SCENE_KEY, b"[1]").unwrap();
        store.set(SCENE_KEY, b"[2]").unwrap();
        assert_eq!(store.get(SCENE_KEY).unwrap(), Some(b"[2]".to_vec()));
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pinboard.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set(SCENE_KEY, b"[]").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(SCENE_KEY).unwrap(), Some(b"[]".to_vec()));
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_init_on_empty_store_gives_empty_scene() {
        let scenes = SceneStore::new(MemoryStore::new());
        assert!(scenes.init().is_empty());
    }

    #[test]
    fn test_init_on_garbage_gives_empty_scene() {
        let mut store = MemoryStore::new();
        store.set(SCENE_KEY, b"{definitely not a scene").unwrap();
        assert!(SceneStore::new(store).init().is_empty());
    }

    #[test]
    fn test_flush_then_init_round_trips() {
        let mut scene = Scene::new();
        scene.add_image(Payload::new("data:image/png;base64,AAAA"), 50, 50);
        scene.add_image(Payload::new("data:image/png;base64,BBBB"), 30, 30);

        let mut scenes = SceneStore::new(SqliteStore::open_in_memory().unwrap());
        assert!(scenes.flush(&scene));

        let restored = scenes.init();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.serialize().unwrap(), scene.serialize().unwrap());
    }

    #[test]
    fn test_broken_store_never_panics() {
        let mut scenes = SceneStore::new(BrokenStore);
        assert!(scenes.init().is_empty());
        assert!(!scenes.flush(&Scene::new()));
    }
}
