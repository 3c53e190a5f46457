//! Session error types

use thiserror::Error;
use tokenguard_domain::ClearReason;

use crate::ports::{RemoteError, StorageError, TransportError};

/// Outcome of a failed refresh, delivered to every waiter of that refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// There was no token pair to refresh.
    #[error("no session to refresh")]
    NoSession,

    /// The refresh token had already lapsed; no request was made.
    #[error("refresh token expired")]
    RefreshTokenExpired,

    /// The token service refused the refresh token.
    #[error("refresh rejected: {message}")]
    Rejected {
        /// Server-provided message.
        message: String,
    },

    /// The token service could not be reached.
    #[error("refresh failed: {message}")]
    Transport {
        /// Transport failure description.
        message: String,
    },

    /// The refresh did not settle within the configured timeout.
    #[error("refresh timed out")]
    TimedOut,

    /// The refresh task went away before reporting an outcome.
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

impl RefreshError {
    /// The reason recorded when this failure clears the session.
    #[must_use]
    pub const fn clear_reason(&self) -> ClearReason {
        match self {
            Self::NoSession | Self::RefreshTokenExpired => ClearReason::RefreshTokenExpired,
            Self::Rejected { .. } | Self::Transport { .. } | Self::TimedOut | Self::Abandoned => {
                ClearReason::RefreshFailed
            }
        }
    }

    /// Whether the session is gone after this failure. Refresh failures
    /// are fail-closed, so every variant ends the session.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(
            self.clear_reason(),
            ClearReason::RefreshTokenExpired | ClearReason::RefreshFailed
        )
    }
}

impl From<RemoteError> for RefreshError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Rejected { message, .. } => Self::Rejected { message },
            RemoteError::Timeout { .. } => Self::TimedOut,
            RemoteError::Transport(message) | RemoteError::InvalidResponse(message) => {
                Self::Transport { message }
            }
        }
    }
}

/// Errors surfaced to callers of the session and of authorized calls.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login, registration or a code request was refused; the server's message, verbatim.
    #[error("{0}")]
    Credential(String),

    /// The session ended and the user must sign in again.
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// The server rejected the call even after one refresh and retry.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status.
        status: u16,
        /// Server-provided message or reason phrase.
        message: String,
    },

    /// A non-authorization HTTP failure.
    #[error("request failed ({status}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Server-provided message or reason phrase.
        message: String,
    },

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The token service could not be used.
    #[error("auth service error: {0}")]
    Remote(RemoteError),
}

impl SessionError {
    /// Returns true when the user has to sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Unauthorized { .. })
    }
}

impl From<RemoteError> for SessionError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Rejected { message, .. } => Self::Credential(message),
            other => Self::Remote(other),
        }
    }
}

impl From<RefreshError> for SessionError {
    fn from(_: RefreshError) -> Self {
        Self::SessionExpired
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
