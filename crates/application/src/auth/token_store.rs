//! Persistent session snapshot storage.
//!
//! Writes the identity and token pair through a [`KeyValueStore`] so a
//! session can be restored after a restart. Unusable snapshots are treated
//! as absent and wiped.

use std::sync::Arc;

use tokenguard_domain::{
    DomainError, Identity, SessionSnapshot, SnapshotLayout, SnapshotParts, StorageKeys,
    TokenState, snapshot::format_instant,
};
use tracing::{debug, warn};

use crate::ports::{KeyValueStore, StorageError};

/// Reads and writes session snapshots under fixed keys.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    layout: SnapshotLayout,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("keys", &self.keys)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Creates a store over `store` using the given key set and layout.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys, layout: SnapshotLayout) -> Self {
        Self {
            store,
            keys,
            layout,
        }
    }

    /// Persists identity and tokens together.
    ///
    /// # Errors
    /// Returns an error if any write fails.
    pub async fn save(&self, identity: &Identity, tokens: &TokenState) -> Result<(), StorageError> {
        let snapshot = SessionSnapshot::new(identity.clone(), tokens.clone());
        match self.layout {
            SnapshotLayout::Combined => self.write_combined(&snapshot).await,
            SnapshotLayout::Split => {
                let parts = snapshot.to_parts().map_err(serialization)?;
                self.write_parts(&parts).await
            }
        }
    }

    /// Persists a refreshed token pair, leaving the identity untouched.
    ///
    /// # Errors
    /// Returns an error if any read or write fails.
    pub async fn save_tokens(&self, tokens: &TokenState) -> Result<(), StorageError> {
        match self.layout {
            SnapshotLayout::Split => {
                let parts = SnapshotParts {
                    identity: None,
                    access_token: Some(tokens.access_token.clone()),
                    refresh_token: Some(tokens.refresh_token.clone()),
                    access_expires_at: Some(format_instant(tokens.access_expires_at)),
                    refresh_expires_at: Some(format_instant(tokens.refresh_expires_at)),
                };
                self.write_parts(&parts).await
            }
            SnapshotLayout::Combined => match self.read_combined().await? {
                Some(mut snapshot) => {
                    snapshot.tokens = tokens.clone();
                    self.write_combined(&snapshot).await
                }
                None => {
                    debug!("no stored snapshot to update with refreshed tokens");
                    Ok(())
                }
            },
        }
    }

    /// Persists an updated identity, leaving the tokens untouched.
    ///
    /// # Errors
    /// Returns an error if any read or write fails.
    pub async fn save_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        match self.layout {
            SnapshotLayout::Split => {
                let json = serde_json::to_string(identity)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                self.store.put(&self.keys.identity(), &json).await
            }
            SnapshotLayout::Combined => match self.read_combined().await? {
                Some(mut snapshot) => {
                    snapshot.identity = identity.clone();
                    self.write_combined(&snapshot).await
                }
                None => Ok(()),
            },
        }
    }

    /// Loads the stored snapshot.
    ///
    /// Partial, malformed, or legacy snapshots without deadlines come back
    /// as `None` and are removed from storage.
    ///
    /// # Errors
    /// Returns an error only if the underlying store fails.
    pub async fn load(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let decoded = match self.layout {
            SnapshotLayout::Combined => match self.store.get(&self.keys.combined()).await? {
                Some(json) => SessionSnapshot::from_json(&json).map(Some),
                None => Ok(None),
            },
            SnapshotLayout::Split => SessionSnapshot::from_parts(self.read_parts().await?),
        };

        match decoded {
            Ok(snapshot) => Ok(snapshot),
            Err(error) => {
                warn!(%error, "discarding unusable session snapshot");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Removes every key either layout may have written.
    ///
    /// # Errors
    /// Returns the first removal error; every key is still attempted.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_all(&self.keys.all()).await
    }

    async fn read_parts(&self) -> Result<SnapshotParts, StorageError> {
        Ok(SnapshotParts {
            identity: self.store.get(&self.keys.identity()).await?,
            access_token: self.store.get(&self.keys.access_token()).await?,
            refresh_token: self.store.get(&self.keys.refresh_token()).await?,
            access_expires_at: self.store.get(&self.keys.access_expires_at()).await?,
            refresh_expires_at: self.store.get(&self.keys.refresh_expires_at()).await?,
        })
    }

    async fn write_parts(&self, parts: &SnapshotParts) -> Result<(), StorageError> {
        let entries = [
            (self.keys.identity(), &parts.identity),
            (self.keys.access_token(), &parts.access_token),
            (self.keys.refresh_token(), &parts.refresh_token),
            (self.keys.access_expires_at(), &parts.access_expires_at),
            (self.keys.refresh_expires_at(), &parts.refresh_expires_at),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                self.store.put(&key, value).await?;
            }
        }
        Ok(())
    }

    async fn read_combined(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        match self.store.get(&self.keys.combined()).await? {
            Some(json) => SessionSnapshot::from_json(&json)
                .map(Some)
                .map_err(serialization),
            None => Ok(None),
        }
    }

    async fn write_combined(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let json = snapshot.to_json().map_err(serialization)?;
        self.store.put(&self.keys.combined(), &json).await
    }
}

fn serialization(error: DomainError) -> StorageError {
    StorageError::Serialization(error.to_string())
}
