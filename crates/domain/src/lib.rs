//! Tokenguard Domain - Core session types
//!
//! This crate defines the session model: token pairs and their deadlines,
//! the authenticated identity, expiry rules, persisted snapshots and the
//! shape of business calls. All types here are pure Rust with no I/O.

pub mod auth;
pub mod error;
pub mod id;
pub mod identity;
pub mod request;
pub mod response;
pub mod settings;
pub mod snapshot;
pub mod state;

pub use auth::{
    AuthMethod, AuthRequest, AuthenticatedGrant, CodeChannel, CodePurpose, Credentials,
    ExpiryPolicy, Registration, TokenGrant, TokenState, TokenStatus, bearer_header,
    token_preview,
};
pub use error::{DomainError, DomainResult};
pub use id::generate_call_id;
pub use identity::{Identity, IdentityPatch};
pub use request::{ApiRequest, HttpMethod};
pub use response::{ApiResponse, Envelope, StatusCode};
pub use settings::SessionConfig;
pub use snapshot::{SessionSnapshot, SnapshotLayout, SnapshotParts, StorageKeys};
pub use state::{ClearReason, SessionStatus};
