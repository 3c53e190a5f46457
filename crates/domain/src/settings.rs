//! Session engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{DEFAULT_ACCESS_SOON_SECONDS, DEFAULT_REFRESH_SOON_SECONDS, ExpiryPolicy};
use crate::error::{DomainError, DomainResult};
use crate::snapshot::{SnapshotLayout, StorageKeys};

/// Tunables for the session engine and its adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// API root, e.g. `http://localhost:3000/api/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix for the login, register, refresh and logout endpoints.
    #[serde(default = "default_auth_base_path")]
    pub auth_base_path: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a refresh may take before it counts as failed.
    #[serde(default = "default_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Access token lead time.
    #[serde(default = "default_access_soon_seconds")]
    pub access_soon_seconds: i64,

    /// Refresh token lead time.
    #[serde(default = "default_refresh_soon_seconds")]
    pub refresh_soon_seconds: i64,

    /// Prefix for persisted keys.
    #[serde(default = "default_storage_namespace")]
    pub storage_namespace: String,

    /// How snapshots are laid out in storage.
    #[serde(default)]
    pub snapshot_layout: SnapshotLayout,

    /// Directory for the file store. `None` means the platform config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Default tracing filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_base_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

fn default_auth_base_path() -> String {
    "/merchant/auth".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_access_soon_seconds() -> i64 {
    DEFAULT_ACCESS_SOON_SECONDS
}

const fn default_refresh_soon_seconds() -> i64 {
    DEFAULT_REFRESH_SOON_SECONDS
}

fn default_storage_namespace() -> String {
    "booknest".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_base_path: default_auth_base_path(),
            request_timeout_ms: default_timeout_ms(),
            refresh_timeout_ms: default_timeout_ms(),
            access_soon_seconds: default_access_soon_seconds(),
            refresh_soon_seconds: default_refresh_soon_seconds(),
            storage_namespace: default_storage_namespace(),
            snapshot_layout: SnapshotLayout::default(),
            storage_dir: None,
            log_filter: default_log_filter(),
        }
    }
}

impl SessionConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> DomainResult<()> {
        self.parsed_base_url()?;
        if self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "requestTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.refresh_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "refreshTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.access_soon_seconds < 0 || self.refresh_soon_seconds < 0 {
            return Err(DomainError::InvalidConfig(
                "expiry lead times cannot be negative".to_string(),
            ));
        }
        if self.storage_namespace.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "storageNamespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses the base URL, accepting only http and https.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] for malformed or non-http URLs.
    pub fn parsed_base_url(&self) -> DomainResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| DomainError::InvalidConfig(format!("baseUrl: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DomainError::InvalidConfig(format!(
                "baseUrl: unsupported scheme '{other}'"
            ))),
        }
    }

    /// Joins the base URL and a path without doubling slashes.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Full URL of an auth endpoint, e.g. `refresh`.
    #[must_use]
    pub fn auth_endpoint(&self, suffix: &str) -> String {
        let base = self.endpoint(&self.auth_base_path);
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }

    /// Path of the profile document, relative to the base URL.
    #[must_use]
    pub fn profile_path(&self) -> String {
        format!("{}/profile", self.auth_base_path.trim_end_matches('/'))
    }

    /// The expiry thresholds.
    #[must_use]
    pub const fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.access_soon_seconds, self.refresh_soon_seconds)
    }

    /// Persisted key names.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(self.storage_namespace.clone())
    }
}
