use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::traits::SessionStorage;

/// Key under which the session user is persisted.
pub const SESSION_STORAGE_KEY: &str = "admin-template-user";

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with `value`, as if a previous session had written it.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(value.into())),
        }
    }

    pub fn peek(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, value: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        *slot = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_key(dir, SESSION_STORAGE_KEY)
    }

    pub fn with_key(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, value)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
