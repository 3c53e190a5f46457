//! Key-value persistence port

use async_trait::async_trait;

/// Errors that can occur during persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// String key-value storage that survives restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes a value. Deleting a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Deletes several values, attempting every key even after a failure.
    ///
    /// # Errors
    /// Returns the first error encountered.
    async fn remove_all(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
