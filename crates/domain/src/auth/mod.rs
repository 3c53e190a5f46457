//! Authentication domain types

mod credentials;
mod expiry;
mod types;

pub use credentials::{
    AuthMethod, AuthRequest, CodeChannel, CodePurpose, Credentials, Registration,
};
pub use expiry::{
    DEFAULT_ACCESS_SOON_SECONDS, DEFAULT_REFRESH_SOON_SECONDS, ExpiryPolicy, TokenStatus,
};
pub use types::{AuthenticatedGrant, TokenGrant, TokenState, bearer_header, token_preview};
