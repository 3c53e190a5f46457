//! Tokenguard Application - Session engine and ports
//!
//! This crate holds the authentication session, the refresh coordinator
//! and the call pipeline, plus the ports their adapters implement.

pub mod auth;
pub mod error;
pub mod ports;

pub use auth::{
    AuthSession, AuthorizedClient, CallAttempt, Recovery, RefreshCoordinator, RefreshOutcome,
    RequestGate, ResponseRecovery, SessionOptions, TokenLedger, TokenStore,
};
pub use error::{RefreshError, SessionError, SessionResult};
pub use ports::{
    ApiTransport, AuthRemote, Clock, KeyValueStore, RemoteError, StorageError, TransportError,
};
