//! Authentication session engine.
//!
//! This module provides:
//! - The session state machine and its persistence
//! - Single-flight token refresh
//! - Proactive and reactive token handling around business calls

mod client;
mod coordinator;
mod gate;
mod recovery;
mod session;
mod token_store;

#[cfg(test)]
pub(crate) mod testing;

pub use client::AuthorizedClient;
pub use coordinator::{RefreshCoordinator, RefreshOutcome, TokenLedger};
pub use gate::RequestGate;
pub use recovery::{CallAttempt, Recovery, ResponseRecovery};
pub use session::{AuthSession, SessionOptions};
pub use token_store::TokenStore;
