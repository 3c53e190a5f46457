//! Configuration loading.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables:
//! - `TOKENGUARD_BASE_URL`
//! - `TOKENGUARD_STORAGE_DIR`
//! - `TOKENGUARD_LOG`
//! - `TOKENGUARD_REQUEST_TIMEOUT_MS`

use std::path::{Path, PathBuf};

use tokenguard_domain::{DomainError, SessionConfig};
use tokio::fs;

use crate::serialization::{SerializationError, from_json_bytes};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while reading the file.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: SerializationError,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// The merged configuration failed validation.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Loads [`SessionConfig`] from file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    use_env: bool,
}

impl ConfigLoader {
    /// Loader reading the default file and the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
            use_env: true,
        }
    }

    /// Reads `path` instead of the default file.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Ignores environment overrides.
    #[must_use]
    pub const fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// `<config dir>/tokenguard/config.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tokenguard").join("config.json"))
    }

    /// Loads and validates the configuration. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or malformed file, a bad
    /// environment value, or a configuration that fails validation.
    pub async fn load(&self) -> Result<SessionConfig, ConfigError> {
        let mut config = match &self.path {
            Some(path) => read_file(path).await?.unwrap_or_default(),
            None => SessionConfig::default(),
        };
        if self.use_env {
            apply_env(&mut config, |name| std::env::var(name).ok())?;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn read_file(path: &Path) -> Result<Option<SessionConfig>, ConfigError> {
    match fs::read(path).await {
        Ok(content) => from_json_bytes(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Applies `TOKENGUARD_*` overrides using `lookup` to read variables.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnv`] for a non-numeric timeout.
pub fn apply_env(
    config: &mut SessionConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = lookup("TOKENGUARD_BASE_URL") {
        config.base_url = url;
    }
    if let Some(dir) = lookup("TOKENGUARD_STORAGE_DIR") {
        config.storage_dir = Some(PathBuf::from(dir));
    }
    if let Some(filter) = lookup("TOKENGUARD_LOG") {
        config.log_filter = filter;
    }
    if let Some(raw) = lookup("TOKENGUARD_REQUEST_TIMEOUT_MS") {
        config.request_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "TOKENGUARD_REQUEST_TIMEOUT_MS",
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tokenguard_domain::SnapshotLayout;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .with_path(dir.path().join("absent.json"))
            .without_env()
            .load()
            .await
            .unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[tokio::test]
    async fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"baseUrl":"https://api.booknest.test/v1","snapshotLayout":"combined","accessSoonSeconds":120}"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_path(&path)
            .without_env()
            .load()
            .await
            .unwrap();

        assert_eq!(config.base_url, "https://api.booknest.test/v1");
        assert_eq!(config.snapshot_layout, SnapshotLayout::Combined);
        assert_eq!(config.access_soon_seconds, 120);
        assert_eq!(config.refresh_soon_seconds, 86_400);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();

        let result = ConfigLoader::new().with_path(&path).without_env().load().await;
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_invalid_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"refreshTimeoutMs":0}"#).unwrap();

        let result = ConfigLoader::new().with_path(&path).without_env().load().await;
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TOKENGUARD_BASE_URL", "https://staging.example.com/api"),
            ("TOKENGUARD_STORAGE_DIR", "/var/lib/tokenguard"),
            ("TOKENGUARD_LOG", "tokenguard=debug"),
            ("TOKENGUARD_REQUEST_TIMEOUT_MS", "2500"),
        ]
        .into_iter()
        .collect();
        let mut config = SessionConfig::default();

        apply_env(&mut config, |name| vars.get(name).map(ToString::to_string)).unwrap();

        assert_eq!(config.base_url, "https://staging.example.com/api");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/var/lib/tokenguard")));
        assert_eq!(config.log_filter, "tokenguard=debug");
        assert_eq!(config.request_timeout_ms, 2_500);
    }

    #[test]
    fn test_bad_timeout_env_is_rejected() {
        let mut config = SessionConfig::default();
        let result = apply_env(&mut config, |name| {
            (name == "TOKENGUARD_REQUEST_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}
