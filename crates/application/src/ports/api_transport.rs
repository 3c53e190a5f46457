//! Business call transport port

use async_trait::async_trait;
use thiserror::Error;

use tokenguard_domain::{ApiRequest, ApiResponse};

/// Errors that prevent a response from being received at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not connect to the server.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The body could not be read or decoded.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// Any other transport failure.
    #[error("request failed: {0}")]
    Other(String),
}

/// Port for issuing business calls.
///
/// A 401 is a normal response here; recovery happens above this layer.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends `request`, attaching `Authorization: Bearer <token>` when a
    /// token is given.
    ///
    /// # Errors
    /// Returns an error only when no HTTP response was received.
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;
}
