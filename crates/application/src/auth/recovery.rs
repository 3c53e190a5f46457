//! Reactive recovery from a 401.

use tokenguard_domain::ApiResponse;
use tracing::{info, warn};

use super::session::AuthSession;
use crate::error::SessionError;

/// Per-call retry bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallAttempt {
    retried: bool,
}

impl CallAttempt {
    /// Whether the call has already been re-issued once.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }
}

/// What to do after an authorization failure.
#[derive(Debug)]
pub enum Recovery {
    /// Re-issue the same call with this token.
    Retry {
        /// Fresh access token.
        access_token: String,
    },
    /// Give up with this error.
    Fail(SessionError),
}

/// Refreshes and retries a call once after a 401.
#[derive(Debug, Clone)]
pub struct ResponseRecovery {
    session: AuthSession,
}

impl ResponseRecovery {
    /// Creates recovery over `session`.
    #[must_use]
    pub const fn new(session: AuthSession) -> Self {
        Self { session }
    }

    /// Handles a 401 for the call tracked by `attempt`.
    ///
    /// The first 401 triggers a (shared) refresh and a single retry. A
    /// second 401, or a failed refresh, yields [`SessionError::Unauthorized`]
    /// built from the rejected response.
    pub async fn on_unauthorized(&self, attempt: &mut CallAttempt, response: &ApiResponse) -> Recovery {
        let rejected = SessionError::Unauthorized {
            status: response.status.as_u16(),
            message: response.error_message(),
        };

        if attempt.retried {
            warn!("call rejected again after refresh");
            return Recovery::Fail(rejected);
        }
        attempt.retried = true;

        match self.session.ensure_refreshed().await {
            Ok(tokens) => {
                info!("token refreshed after 401, retrying call");
                Recovery::Retry {
                    access_token: tokens.access_token,
                }
            }
            Err(error) => {
                warn!(%error, "refresh after 401 failed");
                Recovery::Fail(rejected)
            }
        }
    }
}
