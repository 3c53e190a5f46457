//! The authentication session.
//!
//! [`AuthSession`] owns the identity and token pair. It is the only writer
//! of that state; the refresh coordinator, the request gate and response
//! recovery all go through it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokenguard_domain::{
    AuthRequest, AuthenticatedGrant, ClearReason, CodeChannel, CodePurpose, Credentials,
    ExpiryPolicy, Identity, IdentityPatch, Registration, SessionConfig, SessionStatus, TokenState,
    TokenStatus,
};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use super::coordinator::{RefreshCoordinator, RefreshOutcome, TokenLedger};
use super::token_store::TokenStore;
use crate::error::{SessionError, SessionResult};
use crate::ports::{AuthRemote, Clock};

/// Session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Expiry thresholds.
    pub policy: ExpiryPolicy,
    /// How long a refresh may take before it counts as failed.
    pub refresh_timeout: Duration,
}

impl SessionOptions {
    /// Takes the thresholds and refresh timeout from `config`.
    #[must_use]
    pub const fn from_config(config: &SessionConfig) -> Self {
        Self {
            policy: config.expiry_policy(),
            refresh_timeout: Duration::from_millis(config.refresh_timeout_ms),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Identity and tokens, always held together.
#[derive(Debug, Clone)]
struct Principal {
    identity: Identity,
    tokens: TokenState,
}

/// Writers keep the `principal` write guard until storage and the published
/// status agree with what they wrote.
struct Shared {
    remote: Arc<dyn AuthRemote>,
    store: TokenStore,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    principal: RwLock<Option<Principal>>,
    coordinator: RefreshCoordinator,
    status: watch::Sender<SessionStatus>,
}

impl Shared {
    async fn clear(&self, reason: ClearReason) {
        let mut principal = self.principal.write().await;
        let had_session = principal.take().is_some();
        self.forget(had_session, reason).await;
        drop(principal);
    }

    /// Callers hold the `principal` write guard.
    async fn forget(&self, had_session: bool, reason: ClearReason) {
        if let Err(error) = self.store.clear().await {
            warn!(%error, "failed to remove persisted session");
        }
        let status = if reason.is_involuntary() && had_session {
            SessionStatus::Expired { reason }
        } else {
            SessionStatus::Anonymous
        };
        self.status.send_replace(status);
        if had_session {
            info!(%reason, "session cleared");
        }
    }
}

#[async_trait]
impl TokenLedger for Shared {
    async fn current_tokens(&self) -> Option<TokenState> {
        self.principal.read().await.as_ref().map(|p| p.tokens.clone())
    }

    async fn install_tokens(
        &self,
        used_refresh_token: &str,
        tokens: TokenState,
    ) -> Option<TokenState> {
        let mut principal = self.principal.write().await;
        match principal.as_mut() {
            Some(current) if current.tokens.refresh_token == used_refresh_token => {
                current.tokens = tokens.clone();
            }
            Some(current) => {
                debug!("session changed during refresh, keeping newer tokens");
                return Some(current.tokens.clone());
            }
            None => {
                debug!("session ended during refresh, discarding new tokens");
                return None;
            }
        }
        if let Err(error) = self.store.save_tokens(&tokens).await {
            warn!(%error, "failed to persist refreshed tokens");
        }
        drop(principal);
        Some(tokens)
    }

    async fn clear_after_refresh_failure(&self, used_refresh_token: &str, reason: ClearReason) {
        let mut principal = self.principal.write().await;
        let matches = principal
            .as_ref()
            .is_some_and(|p| p.tokens.refresh_token == used_refresh_token);
        if matches {
            principal.take();
            self.forget(true, reason).await;
        }
        drop(principal);
    }
}

/// An authentication session: `Anonymous` or `Authenticated`.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct AuthSession {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("status", &*self.shared.status.borrow())
            .field("coordinator", &self.shared.coordinator)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Creates an anonymous session.
    #[must_use]
    pub fn new(
        remote: Arc<dyn AuthRemote>,
        store: TokenStore,
        clock: Arc<dyn Clock>,
        options: SessionOptions,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&remote),
            Arc::clone(&clock),
            options.policy,
            options.refresh_timeout,
        );
        let (status, _) = watch::channel(SessionStatus::Anonymous);
        Self {
            shared: Arc::new(Shared {
                remote,
                store,
                clock,
                policy: options.policy,
                principal: RwLock::new(None),
                coordinator,
                status,
            }),
        }
    }

    /// Signs in.
    ///
    /// # Errors
    /// [`SessionError::Credential`] carries the server's message verbatim.
    /// On any error the session is left as it was.
    pub async fn login(&self, credentials: Credentials) -> SessionResult<Identity> {
        self.authenticate(AuthRequest::Login(credentials)).await
    }

    /// Creates an account and signs in.
    ///
    /// # Errors
    /// Same as [`AuthSession::login`].
    pub async fn register(&self, registration: Registration) -> SessionResult<Identity> {
        self.authenticate(AuthRequest::Register(registration)).await
    }

    async fn authenticate(&self, request: AuthRequest) -> SessionResult<Identity> {
        let method = request.method();
        let grant = match self.shared.remote.authenticate(&request).await {
            Ok(grant) => grant,
            Err(error) => {
                info!(?method, %error, "authentication refused");
                return Err(SessionError::from(error));
            }
        };
        let identity = self.establish(grant).await;
        info!(?method, user_id = %identity.id, "signed in");
        Ok(identity)
    }

    async fn establish(&self, grant: AuthenticatedGrant) -> Identity {
        let tokens = TokenState::from_grant(grant.tokens, self.now());
        let identity = grant.identity;
        let mut principal = self.shared.principal.write().await;
        *principal = Some(Principal {
            identity: identity.clone(),
            tokens: tokens.clone(),
        });
        if let Err(error) = self.shared.store.save(&identity, &tokens).await {
            warn!(%error, "failed to persist session");
        }
        self.shared.status.send_replace(SessionStatus::Authenticated {
            user_id: identity.id.clone(),
        });
        drop(principal);
        identity
    }

    /// Asks the token service to deliver a one-time code for a code-based
    /// login or a registration. Does not touch session state.
    ///
    /// # Errors
    /// [`SessionError::Credential`] carries the server's refusal verbatim.
    pub async fn send_code(
        &self,
        channel: CodeChannel,
        purpose: CodePurpose,
        target: &str,
    ) -> SessionResult<()> {
        match self.shared.remote.send_code(channel, purpose, target).await {
            Ok(()) => {
                info!(?channel, ?purpose, "verification code sent");
                Ok(())
            }
            Err(error) => {
                info!(?channel, ?purpose, %error, "verification code refused");
                Err(SessionError::from(error))
            }
        }
    }

    /// Signs out. Revocation is best effort; local state is always cleared.
    pub async fn logout(&self) {
        let refresh_token = self
            .shared
            .principal
            .read()
            .await
            .as_ref()
            .map(|p| p.tokens.refresh_token.clone());
        if let Some(refresh_token) = refresh_token
            && let Err(error) = self.shared.remote.revoke(&refresh_token).await
        {
            warn!(%error, "token revocation failed, clearing locally");
        }
        self.shared.clear(ClearReason::Logout).await;
    }

    /// Rebuilds the session from storage without any network call.
    ///
    /// Returns whether the session is now authenticated. A snapshot whose
    /// refresh token has lapsed is removed and the session stays anonymous.
    /// A session that is already signed in is kept as is.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] if the store cannot be read.
    pub async fn restore(&self) -> SessionResult<bool> {
        let mut principal = self.shared.principal.write().await;
        if principal.is_some() {
            debug!("already signed in, skipping restore");
            return Ok(true);
        }
        let Some(snapshot) = self.shared.store.load().await? else {
            debug!("no stored session");
            return Ok(false);
        };

        if !snapshot.is_restorable(self.now()) {
            info!("stored session has expired");
            self.shared
                .forget(false, ClearReason::RefreshTokenExpired)
                .await;
            return Ok(false);
        }

        let user_id = snapshot.identity.id.clone();
        *principal = Some(Principal {
            identity: snapshot.identity,
            tokens: snapshot.tokens,
        });
        self.shared
            .status
            .send_replace(SessionStatus::Authenticated {
                user_id: user_id.clone(),
            });
        drop(principal);
        info!(%user_id, "session restored");
        Ok(true)
    }

    /// Restores from storage when anonymous, then reports whether the
    /// session is authenticated. Storage failures count as anonymous.
    pub async fn ensure_restored(&self) -> bool {
        if self.is_authenticated().await {
            return true;
        }
        self.restore().await.unwrap_or_else(|error| {
            warn!(%error, "could not restore session");
            false
        })
    }

    /// True when both identity and tokens are held.
    pub async fn is_authenticated(&self) -> bool {
        self.shared.principal.read().await.is_some()
    }

    /// The signed-in identity.
    pub async fn identity(&self) -> Option<Identity> {
        self.shared
            .principal
            .read()
            .await
            .as_ref()
            .map(|p| p.identity.clone())
    }

    /// The current token pair.
    pub async fn tokens(&self) -> Option<TokenState> {
        self.shared.current_tokens().await
    }

    /// Case-insensitive role check; false when anonymous.
    pub async fn has_role(&self, role: &str) -> bool {
        self.shared
            .principal
            .read()
            .await
            .as_ref()
            .is_some_and(|p| p.identity.has_role(role))
    }

    /// Merges `patch` into the current identity and persists it.
    ///
    /// Returns the updated identity, or `None` when anonymous.
    pub async fn update_identity(&self, patch: IdentityPatch) -> Option<Identity> {
        let mut principal = self.shared.principal.write().await;
        let current = principal.as_mut()?;
        current.identity.apply(patch);
        let updated = current.identity.clone();
        if let Err(error) = self.shared.store.save_identity(&updated).await {
            warn!(%error, "failed to persist identity");
        }
        drop(principal);
        Some(updated)
    }

    /// Access token status for display.
    pub async fn token_status(&self) -> TokenStatus {
        let tokens = self.tokens().await;
        self.shared.policy.status(tokens.as_ref(), self.now())
    }

    /// True when anonymous or the access token lapses within the threshold.
    pub async fn is_access_expiring_soon(&self) -> bool {
        let tokens = self.tokens().await;
        self.shared
            .policy
            .is_access_expiring_soon(tokens.as_ref(), self.now())
    }

    /// True when anonymous or the refresh token lapses within the threshold.
    pub async fn is_refresh_expiring_soon(&self) -> bool {
        let tokens = self.tokens().await;
        self.shared
            .policy
            .is_refresh_expiring_soon(tokens.as_ref(), self.now())
    }

    /// True when anonymous or the refresh deadline has passed.
    pub async fn is_refresh_expired(&self) -> bool {
        let tokens = self.tokens().await;
        self.shared
            .policy
            .is_refresh_expired(tokens.as_ref(), self.now())
    }

    /// Refreshes the token pair, joining a refresh already in flight.
    ///
    /// # Errors
    /// On failure the session has already been cleared.
    pub async fn ensure_refreshed(&self) -> RefreshOutcome {
        let ledger: Arc<dyn TokenLedger> = self.shared.clone();
        self.shared.coordinator.ensure_refreshed(ledger).await
    }

    /// Clears the session without contacting the token service.
    pub async fn expire(&self, reason: ClearReason) {
        self.shared.clear(reason).await;
    }

    /// Watches status transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// The latest published status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.shared.status.borrow().clone()
    }

    /// The session's refresh coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.shared.coordinator
    }

    /// The expiry thresholds in use.
    #[must_use]
    pub fn policy(&self) -> ExpiryPolicy {
        self.shared.policy
    }

    /// Current time from the session's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }
}
