//! Session status as observed by subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current authentication status of a session.
///
/// Published on every transition so observers can redirect to a login
/// screen when a session is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nobody is signed in.
    #[default]
    Anonymous,

    /// A principal is signed in.
    Authenticated {
        /// Backend user id.
        user_id: String,
    },

    /// The session was cleared without the user asking for it.
    Expired {
        /// Why the session ended.
        reason: ClearReason,
    },
}

impl SessionStatus {
    /// Returns true for [`SessionStatus::Authenticated`].
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Returns the signed-in user id.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }
}

/// Why a session was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// The user signed out.
    Logout,
    /// The refresh token itself had expired.
    RefreshTokenExpired,
    /// The backend rejected the refresh or it could not complete.
    RefreshFailed,
    /// The persisted snapshot was unusable.
    InvalidSnapshot,
}

impl ClearReason {
    /// Returns true when the user did not initiate the clear.
    #[must_use]
    pub const fn is_involuntary(self) -> bool {
        !matches!(self, Self::Logout)
    }
}

impl fmt::Display for ClearReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Logout => "signed out",
            Self::RefreshTokenExpired => "refresh token expired",
            Self::RefreshFailed => "token refresh failed",
            Self::InvalidSnapshot => "stored session was invalid",
        };
        f.write_str(text)
    }
}
