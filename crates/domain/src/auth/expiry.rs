//! Expiry checks for token pairs.
//!
//! Every check treats a missing token pair as already expired, so callers
//! never need a separate "is there a session?" branch before asking.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::types::TokenState;

/// Default lead time before access-token expiry that triggers a refresh.
pub const DEFAULT_ACCESS_SOON_SECONDS: i64 = 300;

/// Default lead time before refresh-token expiry considered "soon".
pub const DEFAULT_REFRESH_SOON_SECONDS: i64 = 86_400;

/// Thresholds for deciding when tokens are about to lapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryPolicy {
    /// Seconds before access expiry at which a proactive refresh runs.
    pub access_soon_seconds: i64,
    /// Seconds before refresh expiry at which re-login should be prompted.
    pub refresh_soon_seconds: i64,
}

impl ExpiryPolicy {
    /// Creates a policy with custom thresholds.
    #[must_use]
    pub const fn new(access_soon_seconds: i64, refresh_soon_seconds: i64) -> Self {
        Self {
            access_soon_seconds,
            refresh_soon_seconds,
        }
    }

    /// True if there are no tokens or the access token lapses within the threshold.
    #[must_use]
    pub fn is_access_expiring_soon(&self, tokens: Option<&TokenState>, now: DateTime<Utc>) -> bool {
        tokens.is_none_or(|t| t.access_expires_at - now <= lead(self.access_soon_seconds))
    }

    /// True if there are no tokens or the refresh deadline has passed.
    #[must_use]
    pub fn is_refresh_expired(&self, tokens: Option<&TokenState>, now: DateTime<Utc>) -> bool {
        tokens.is_none_or(|t| t.refresh_expires_at <= now)
    }

    /// True if there are no tokens or the refresh token lapses within the threshold.
    #[must_use]
    pub fn is_refresh_expiring_soon(&self, tokens: Option<&TokenState>, now: DateTime<Utc>) -> bool {
        tokens.is_none_or(|t| t.refresh_expires_at - now <= lead(self.refresh_soon_seconds))
    }

    /// Summarises the token pair for display.
    #[must_use]
    pub fn status(&self, tokens: Option<&TokenState>, now: DateTime<Utc>) -> TokenStatus {
        let Some(state) = tokens else {
            return TokenStatus::NotAuthenticated;
        };

        if state.access_expires_at <= now {
            TokenStatus::Expired {
                can_refresh: !self.is_refresh_expired(tokens, now),
            }
        } else if self.is_access_expiring_soon(tokens, now) {
            TokenStatus::Expiring {
                seconds_remaining: state.seconds_until_access_expiry(now),
            }
        } else {
            TokenStatus::Valid {
                seconds_remaining: state.seconds_until_access_expiry(now),
            }
        }
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_SOON_SECONDS, DEFAULT_REFRESH_SOON_SECONDS)
    }
}

fn lead(seconds: i64) -> TimeDelta {
    TimeDelta::try_seconds(seconds).unwrap_or(if seconds < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

/// Status of the access token for UI display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenStatus {
    /// No token pair is held.
    NotAuthenticated,
    /// Access token is valid and not expiring soon.
    Valid {
        /// Seconds until the access token expires.
        seconds_remaining: i64,
    },
    /// Access token is valid but will be refreshed on the next call.
    Expiring {
        /// Seconds until the access token expires.
        seconds_remaining: i64,
    },
    /// Access token has expired.
    Expired {
        /// Whether the refresh token can still renew the pair.
        can_refresh: bool,
    },
}

impl TokenStatus {
    /// Returns true if the access token is still accepted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Expiring { .. })
    }

    /// Returns true if the token needs attention (expiring or expired).
    #[must_use]
    pub const fn needs_attention(&self) -> bool {
        matches!(self, Self::Expiring { .. } | Self::Expired { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not signed in".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 3600 {
                    format!("Valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Valid for {} minutes", secs / 60)
                } else {
                    format!("Valid for {secs} seconds")
                }
            }
            Self::Expiring { seconds_remaining } => {
                format!("Expiring in {seconds_remaining} seconds (will auto-refresh)")
            }
            Self::Expired { can_refresh: true } => "Expired (will refresh on next request)".to_string(),
            Self::Expired { can_refresh: false } => "Session expired, please sign in again".to_string(),
        }
    }
}
