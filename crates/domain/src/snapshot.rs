//! Persisted projection of a session.
//!
//! A snapshot is what survives a restart: the identity plus the token pair
//! with its absolute deadlines. It can be written either as one key per
//! field (the layout browser clients of the same backend use) or as a
//! single JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenState;
use crate::error::{DomainError, DomainResult};
use crate::identity::Identity;

/// Identity and tokens as they were when last persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// The authenticated principal.
    pub identity: Identity,
    /// The token pair.
    pub tokens: TokenState,
}

impl SessionSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(identity: Identity, tokens: TokenState) -> Self {
        Self { identity, tokens }
    }

    /// A snapshot is worth restoring only while its refresh token is alive.
    #[must_use]
    pub fn is_restorable(&self, now: DateTime<Utc>) -> bool {
        self.tokens.refresh_expires_at > now
    }

    /// Encodes the snapshot as a single JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string(self).map_err(|e| DomainError::InvalidSnapshot(e.to_string()))
    }

    /// Decodes a snapshot written by [`SessionSnapshot::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or incomplete.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        serde_json::from_str(json).map_err(|e| DomainError::InvalidSnapshot(e.to_string()))
    }

    /// Reassembles a snapshot from individually stored fields.
    ///
    /// Returns `Ok(None)` when nothing was stored, and an error when only
    /// part of a session is present (the "both tokens or neither" rule).
    ///
    /// # Errors
    ///
    /// Returns an error for partial or unparsable fields.
    pub fn from_parts(parts: SnapshotParts) -> DomainResult<Option<Self>> {
        let SnapshotParts {
            identity,
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        } = parts;

        match (identity, access_token, refresh_token) {
            (None, None, None) => Ok(None),
            (Some(identity), Some(access), Some(refresh)) => {
                let identity: Identity = serde_json::from_str(&identity)
                    .map_err(|e| DomainError::InvalidSnapshot(format!("identity: {e}")))?;
                let (Some(access_at), Some(refresh_at)) = (access_expires_at, refresh_expires_at)
                else {
                    return Err(DomainError::IncompleteSnapshot(
                        "expiry deadlines are missing".to_string(),
                    ));
                };
                let tokens = TokenState::new(
                    access,
                    refresh,
                    parse_instant("access expiry", &access_at)?,
                    parse_instant("refresh expiry", &refresh_at)?,
                );
                Ok(Some(Self::new(identity, tokens)))
            }
            _ => Err(DomainError::IncompleteSnapshot(
                "identity and both tokens must be stored together".to_string(),
            )),
        }
    }

    /// Splits the snapshot into individually storable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be serialized.
    pub fn to_parts(&self) -> DomainResult<SnapshotParts> {
        let identity = serde_json::to_string(&self.identity)
            .map_err(|e| DomainError::InvalidSnapshot(e.to_string()))?;
        Ok(SnapshotParts {
            identity: Some(identity),
            access_token: Some(self.tokens.access_token.clone()),
            refresh_token: Some(self.tokens.refresh_token.clone()),
            access_expires_at: Some(format_instant(self.tokens.access_expires_at)),
            refresh_expires_at: Some(format_instant(self.tokens.refresh_expires_at)),
        })
    }
}

/// Raw string values for the split storage layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotParts {
    /// Identity JSON.
    pub identity: Option<String>,
    /// Raw access token.
    pub access_token: Option<String>,
    /// Raw refresh token.
    pub refresh_token: Option<String>,
    /// RFC 3339 access deadline.
    pub access_expires_at: Option<String>,
    /// RFC 3339 refresh deadline.
    pub refresh_expires_at: Option<String>,
}

/// Formats an instant the way snapshots store it.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

fn parse_instant(what: &str, raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::InvalidSnapshot(format!("{what}: {e}")))
}

/// How a snapshot is laid out in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotLayout {
    /// One key per field.
    #[default]
    Split,
    /// A single key holding the whole snapshot as JSON.
    Combined,
}

/// Fixed key names under a namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    /// Creates the key set for a namespace, e.g. `booknest`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.namespace)
    }

    /// Identity JSON.
    #[must_use]
    pub fn identity(&self) -> String {
        self.key("user_info")
    }

    /// Access token.
    #[must_use]
    pub fn access_token(&self) -> String {
        self.key("access_token")
    }

    /// Refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> String {
        self.key("refresh_token")
    }

    /// Access deadline.
    #[must_use]
    pub fn access_expires_at(&self) -> String {
        self.key("access_expires_at")
    }

    /// Refresh deadline.
    #[must_use]
    pub fn refresh_expires_at(&self) -> String {
        self.key("refresh_expires_at")
    }

    /// Whole-snapshot key for the combined layout.
    #[must_use]
    pub fn combined(&self) -> String {
        self.key("session")
    }

    /// Every key either layout may write.
    #[must_use]
    pub fn all(&self) -> [String; 6] {
        [
            self.identity(),
            self.access_token(),
            self.refresh_token(),
            self.access_expires_at(),
            self.refresh_expires_at(),
            self.combined(),
        ]
    }
}
