//! Token service port
//!
//! Defines the interface to the backend that issues, refreshes and revokes
//! token pairs.

use async_trait::async_trait;
use thiserror::Error;

use tokenguard_domain::{AuthRequest, AuthenticatedGrant, CodeChannel, CodePurpose, TokenGrant};

/// Errors returned by the token service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service answered with an error; `message` is its own wording.
    #[error("{message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// The service could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service did not answer in time.
    #[error("auth request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The service answered with something that is not a token payload.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Returns true when the service refused the credential itself.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403, .. })
    }
}

/// Port for the backend token service.
#[async_trait]
pub trait AuthRemote: Send + Sync {
    /// Signs in or registers, returning the principal and a token pair.
    ///
    /// # Errors
    /// Returns [`RemoteError::Rejected`] with the server's message when the
    /// credentials are refused.
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedGrant, RemoteError>;

    /// Exchanges a refresh token for a new pair.
    ///
    /// # Errors
    /// Returns an error when the refresh token is refused or the call fails.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RemoteError>;

    /// Invalidates a refresh token on the server.
    ///
    /// # Errors
    /// Returns an error when the call fails. Callers treat this as best effort.
    async fn revoke(&self, refresh_token: &str) -> Result<(), RemoteError>;

    /// Asks the service to deliver a one-time code to `target`, a phone
    /// number or email address depending on `channel`.
    ///
    /// # Errors
    /// Returns [`RemoteError::Rejected`] when the service refuses, for
    /// example a registration code for a contact that already has an account.
    async fn send_code(
        &self,
        channel: CodeChannel,
        purpose: CodePurpose,
        target: &str,
    ) -> Result<(), RemoteError>;
}
