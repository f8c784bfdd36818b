use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fixed record key for the persisted conversation collection.
pub const CONVERSATIONS_KEY: &str = "conversations";
/// Fixed record key for the persisted settings.
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed persisted data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A synchronous string key-value store in the shape of browser local
/// storage. Absent keys read as `None`;
/// removing an absent key is a no-op. Backends may fail on I/O.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Used for testing and as the ephemeral fallback when no
/// storage directory is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Filesystem store keeping one `<key>.json` file per key under a
/// directory created on construction.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // Write-then-rename keeps the record whole even if the write is
        // interrupted; a torn write must never surface as malformed data
        // on the next load.
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let mut store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());

        // removing an absent key stays a no-op
        store.remove("k").unwrap();
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = std::env::temp_dir().join(format!("rechat-store-{}", uuid::Uuid::new_v4()));
        let mut store = FileStore::new(&dir).unwrap();

        assert!(store.get("settings").unwrap().is_none());

        store.set("settings", "{}").unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some("{}"));

        store.remove("settings").unwrap();
        assert!(store.get("settings").unwrap().is_none());
        store.remove("settings").unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_store_overwrite_is_complete_and_leaves_no_temp_file() {
        let dir = std::env::temp_dir().join(format!("rechat-store-{}", uuid::Uuid::new_v4()));
        let mut store = FileStore::new(&dir).unwrap();

        store.set("conversations", r#"{"conversations":[]}"#).unwrap();
        store.set("conversations", r#"{"conversations":[{}]}"#).unwrap();
        assert_eq!(
            store.get("conversations").unwrap().as_deref(),
            Some(r#"{"conversations":[{}]}"#)
        );

        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["conversations.json".to_string()]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
