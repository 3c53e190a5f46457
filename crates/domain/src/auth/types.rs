//! Token types with absolute expiry tracking

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A freshly issued token pair, as returned by the token service.
///
/// Lifetimes are relative; they become absolute deadlines once the grant
/// is turned into a [`TokenState`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Long-lived credential used only to obtain a new pair.
    pub refresh_token: String,
    /// Seconds until the access token expires.
    #[serde(rename = "expiresIn")]
    pub access_ttl_seconds: u64,
    /// Seconds until the refresh token expires.
    #[serde(rename = "refreshExpiresIn")]
    pub refresh_ttl_seconds: u64,
}

impl TokenGrant {
    /// Creates a new grant.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_ttl_seconds: u64,
        refresh_ttl_seconds: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &token_preview(&self.access_token))
            .field("refresh_token", &token_preview(&self.refresh_token))
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedGrant {
    /// The principal the tokens were issued to.
    pub identity: Identity,
    /// The issued token pair.
    pub tokens: TokenGrant,
}

/// The current access/refresh pair with absolute deadlines.
///
/// Both tokens always travel together: there is no way to hold one
/// without the other.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenState {
    /// Bearer credential attached to API calls.
    pub access_token: String,
    /// Credential exchanged for a new pair.
    pub refresh_token: String,
    /// When the access token stops being accepted.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token stops being accepted.
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenState {
    /// Creates a token state from explicit deadlines.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_expires_at,
            refresh_expires_at,
        }
    }

    /// Anchors a grant's relative lifetimes at `now`.
    #[must_use]
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            access_expires_at: deadline_after(now, grant.access_ttl_seconds),
            refresh_expires_at: deadline_after(now, grant.refresh_ttl_seconds),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        }
    }

    /// Whole seconds until the access token expires (negative once past).
    #[must_use]
    pub fn seconds_until_access_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.access_expires_at - now).num_seconds()
    }

    /// Whole seconds until the refresh token expires (negative once past).
    #[must_use]
    pub fn seconds_until_refresh_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.refresh_expires_at - now).num_seconds()
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        bearer_header(&self.access_token)
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &token_preview(&self.access_token))
            .field("refresh_token", &token_preview(&self.refresh_token))
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Formats a bearer Authorization header value.
#[must_use]
pub fn bearer_header(access_token: &str) -> String {
    format!("Bearer {access_token}")
}

/// Get a preview of a token (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.chars().count() > 12 {
        let head: String = token.chars().take(8).collect();
        format!("{head}...")
    } else {
        token.to_string()
    }
}

fn deadline_after(now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
