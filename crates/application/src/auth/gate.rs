//! Proactive token check before a call is sent.

use tokenguard_domain::ClearReason;
use tracing::{debug, warn};

use super::session::AuthSession;
use crate::error::{SessionError, SessionResult};

/// Decides which access token, if any, an outgoing call carries.
#[derive(Debug, Clone)]
pub struct RequestGate {
    session: AuthSession,
}

impl RequestGate {
    /// Creates a gate over `session`.
    #[must_use]
    pub const fn new(session: AuthSession) -> Self {
        Self { session }
    }

    /// Returns the access token to attach.
    ///
    /// - Anonymous: `None`, the call goes out unauthenticated.
    /// - Refresh token lapsed: the session is cleared and the call is not sent.
    /// - Access token expiring soon: refreshed first; if that fails the stale
    ///   token is attached and the server decides.
    ///
    /// # Errors
    /// Returns [`SessionError::SessionExpired`] when the refresh token has lapsed.
    pub async fn authorize(&self) -> SessionResult<Option<String>> {
        let Some(tokens) = self.session.tokens().await else {
            return Ok(None);
        };

        let policy = self.session.policy();
        let now = self.session.now();

        if policy.is_refresh_expired(Some(&tokens), now) {
            warn!("refresh token expired before call, ending session");
            self.session.expire(ClearReason::RefreshTokenExpired).await;
            return Err(SessionError::SessionExpired);
        }

        if policy.is_access_expiring_soon(Some(&tokens), now) {
            debug!(
                seconds_left = tokens.seconds_until_access_expiry(now),
                "access token expiring soon, refreshing first"
            );
            return match self.session.ensure_refreshed().await {
                Ok(fresh) => Ok(Some(fresh.access_token)),
                Err(error) => {
                    warn!(%error, "proactive refresh failed, sending current token");
                    Ok(Some(tokens.access_token))
                }
            };
        }

        Ok(Some(tokens.access_token))
    }
}
