//! File-backed key-value store.
//!
//! All entries live in one `session-store.json` in the storage directory,
//! by default the platform config directory:
//! - Linux: ~/.config/tokenguard/session-store.json
//! - macOS: ~/Library/Application Support/tokenguard/session-store.json
//! - Windows: %APPDATA%/tokenguard/session-store.json
//!
//! The file contains bearer credentials; it is written with owner-only
//! permissions on Unix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokenguard_application::ports::{KeyValueStore, StorageError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// File name inside the storage directory.
pub const STORE_FILE_NAME: &str = "session-store.json";

/// Key-value store persisted as a single JSON object.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a store writing to `dir/session-store.json`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// The platform default storage directory.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tokenguard"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(content) => {
                from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::Io(e)),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content =
            to_json_stable_bytes(entries).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        restrict_permissions(&tmp).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "session store written");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[String]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(key);
        }
        if entries.len() != before {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}
