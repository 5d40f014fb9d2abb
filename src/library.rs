use crate::models::{MediaType, SavedItem};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Named slot holding the serialized saved list.
pub const LIBRARY_SLOT: &str = "cineverse.library";

/// String key/value storage, the localStorage analog. Injected so the
/// library can run against a file on disk or an in-memory fake.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One file per slot under a data directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read slot '{key}'")),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::write(self.slot_path(key), value)
            .with_context(|| format!("failed to write slot '{key}'"))
    }
}

/// In-memory fake for tests. Writes can be toggled to fail to exercise the
/// non-fatal write-error path.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage
            .slots
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        storage
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("storage quota exceeded");
        }
        self.slots
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The saved-items list. Every operation is a full read-modify-write of the
/// slot; concurrent writers are not serialized, so the last write wins.
pub struct Library {
    storage: Arc<dyn Storage>,
}

impl Library {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Absent or unparseable content degrades to an empty list.
    pub fn load_all(&self) -> Vec<SavedItem> {
        let raw = match self.storage.get(LIBRARY_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("failed to read saved list, treating as empty: {err:#}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(err) => {
                warn!("saved list is not valid JSON, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, id: i64, media_type: MediaType) -> bool {
        self.load_all()
            .iter()
            .any(|item| item.matches(id, media_type))
    }

    /// Appends unless an item with the same (id, media_type) already exists.
    pub fn add(&self, item: SavedItem) -> Result<()> {
        let mut items = self.load_all();
        if items.iter().any(|it| it.matches(item.id, item.media_type)) {
            return Ok(());
        }
        items.push(item);
        self.save(&items)
    }

    pub fn remove(&self, id: i64, media_type: MediaType) -> Result<()> {
        let mut items = self.load_all();
        items.retain(|item| !item.matches(id, media_type));
        self.save(&items)
    }

    fn save(&self, items: &[SavedItem]) -> Result<()> {
        let raw = serde_json::to_string(items).context("failed to serialize saved list")?;
        self.storage
            .set(LIBRARY_SLOT, &raw)
            .context("failed to persist saved list")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn movie(id: i64, title: &str) -> SavedItem {
        SavedItem {
            id,
            media_type: MediaType::Movie,
            title: title.to_string(),
            poster_path: None,
        }
    }

    fn memory_library() -> (Library, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (Library::new(storage.clone()), storage)
    }

    #[test]
    fn add_then_contains_then_remove() {
        let (library, _) = memory_library();
        library.add(movie(7, "Y")).unwrap();
        assert!(library.contains(7, MediaType::Movie));
        assert!(!library.contains(7, MediaType::Tv));
        assert_eq!(library.load_all(), vec![movie(7, "Y")]);

        library.remove(7, MediaType::Movie).unwrap();
        assert!(!library.contains(7, MediaType::Movie));
        assert!(library.load_all().is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let (library, _) = memory_library();
        library.add(movie(7, "Y")).unwrap();
        library.add(movie(7, "Y duplicate")).unwrap();
        assert_eq!(library.load_all(), vec![movie(7, "Y")]);
    }

    #[test]
    fn same_id_different_media_types_coexist() {
        let (library, _) = memory_library();
        library.add(movie(7, "Movie")).unwrap();
        library
            .add(SavedItem {
                id: 7,
                media_type: MediaType::Tv,
                title: "Show".to_string(),
                poster_path: None,
            })
            .unwrap();
        assert_eq!(library.load_all().len(), 2);

        library.remove(7, MediaType::Tv).unwrap();
        assert_eq!(library.load_all(), vec![movie(7, "Movie")]);
    }

    #[test]
    fn malformed_slot_loads_as_empty() {
        let storage = Arc::new(MemoryStorage::with_slot(LIBRARY_SLOT, "not json {"));
        let library = Library::new(storage);
        assert!(library.load_all().is_empty());
    }

    #[test]
    fn failed_write_keeps_last_successful_state() {
        let (library, storage) = memory_library();
        library.add(movie(1, "Kept")).unwrap();

        storage.set_fail_writes(true);
        assert!(library.add(movie(2, "Dropped")).is_err());
        assert!(library.remove(1, MediaType::Movie).is_err());

        storage.set_fail_writes(false);
        assert_eq!(library.load_all(), vec![movie(1, "Kept")]);
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let library = Library::new(storage.clone());

        assert!(library.load_all().is_empty());
        library.add(movie(7, "Y")).unwrap();

        // A fresh library over the same directory sees the persisted list.
        let reopened = Library::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
        assert_eq!(reopened.load_all(), vec![movie(7, "Y")]);
    }
}
