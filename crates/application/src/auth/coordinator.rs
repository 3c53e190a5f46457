//! Single-flight token refresh.
//!
//! However many callers ask for a refresh while one is running, the token
//! service sees exactly one request, and every caller receives the same
//! outcome once it settles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokenguard_domain::{ClearReason, ExpiryPolicy, TokenState, token_preview};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::ports::{AuthRemote, Clock};

/// Result delivered to every waiter of one refresh.
pub type RefreshOutcome = Result<TokenState, RefreshError>;

/// The session state a refresh reads from and writes back to.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// The token pair currently held, if any.
    async fn current_tokens(&self) -> Option<TokenState>;

    /// Installs `tokens` if the session still holds `used_refresh_token`.
    ///
    /// Returns the pair in effect afterwards: `tokens` when installed, the
    /// newer pair of a session that replaced this one, or `None` when the
    /// session is gone.
    async fn install_tokens(&self, used_refresh_token: &str, tokens: TokenState)
    -> Option<TokenState>;

    /// Clears the session if it still holds `used_refresh_token`.
    async fn clear_after_refresh_failure(&self, used_refresh_token: &str, reason: ClearReason);
}

#[derive(Default)]
struct Flight {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

struct Inner {
    remote: Arc<dyn AuthRemote>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    refresh_timeout: Duration,
    flight: Mutex<Flight>,
    refresh_calls: AtomicUsize,
}

impl Inner {
    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one refresh on its own task. A refresh that panics still
    /// clears the session before its waiters hear about it.
    async fn drive(self: Arc<Self>, ledger: Arc<dyn TokenLedger>) -> RefreshOutcome {
        let Some(current) = ledger.current_tokens().await else {
            return Err(RefreshError::NoSession);
        };

        let attempt = tokio::spawn({
            let inner = Arc::clone(&self);
            let ledger = Arc::clone(&ledger);
            let current = current.clone();
            async move { inner.run(ledger.as_ref(), current).await }
        });

        match attempt.await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, "token refresh task failed, clearing session");
                ledger
                    .clear_after_refresh_failure(&current.refresh_token, ClearReason::RefreshFailed)
                    .await;
                Err(RefreshError::Abandoned)
            }
        }
    }

    async fn run(&self, ledger: &dyn TokenLedger, current: TokenState) -> RefreshOutcome {
        if self
            .policy
            .is_refresh_expired(Some(&current), self.clock.now())
        {
            warn!("refresh token expired, skipping refresh request");
            ledger
                .clear_after_refresh_failure(&current.refresh_token, ClearReason::RefreshTokenExpired)
                .await;
            return Err(RefreshError::RefreshTokenExpired);
        }

        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            refresh_token = %token_preview(&current.refresh_token),
            "requesting token refresh"
        );

        let error = match tokio::time::timeout(
            self.refresh_timeout,
            self.remote.refresh(&current.refresh_token),
        )
        .await
        {
            Ok(Ok(grant)) => {
                let tokens = TokenState::from_grant(grant, self.clock.now());
                return ledger
                    .install_tokens(&current.refresh_token, tokens)
                    .await
                    .ok_or(RefreshError::NoSession);
            }
            Ok(Err(remote)) => RefreshError::from(remote),
            Err(_) => RefreshError::TimedOut,
        };

        warn!(%error, "token refresh failed, clearing session");
        ledger
            .clear_after_refresh_failure(&current.refresh_token, error.clear_reason())
            .await;
        Err(error)
    }
}

/// Releases every waiter exactly once, even if the refresh task is dropped
/// before producing an outcome. That only happens when the runtime shuts
/// down, so no session is cleared on that path.
struct Settle {
    inner: Arc<Inner>,
    outcome: Option<RefreshOutcome>,
}

impl Drop for Settle {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(Err(RefreshError::Abandoned));
        let waiters = {
            let mut flight = self.inner.flight();
            flight.in_flight = false;
            std::mem::take(&mut flight.waiters)
        };
        info!(
            success = outcome.is_ok(),
            waiters = waiters.len(),
            "token refresh settled"
        );
        for waiter in waiters {
            // A waiter that stopped listening just discards the outcome.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Collapses concurrent refresh requests into a single token service call.
///
/// One coordinator belongs to one session. Cloning shares the same flight.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &self.is_in_flight())
            .field("pending_waiters", &self.pending_waiters())
            .field("refresh_timeout", &self.inner.refresh_timeout)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        remote: Arc<dyn AuthRemote>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                clock,
                policy,
                refresh_timeout,
                flight: Mutex::new(Flight::default()),
                refresh_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Refreshes the ledger's tokens, or joins the refresh already running.
    ///
    /// The refresh runs on its own task, so it completes even if this
    /// future is dropped. On failure the session has been cleared by the
    /// time any waiter wakes.
    ///
    /// # Errors
    /// Returns the shared [`RefreshError`] when the refresh fails.
    pub async fn ensure_refreshed(&self, ledger: Arc<dyn TokenLedger>) -> RefreshOutcome {
        let (sender, receiver) = oneshot::channel();
        let lead = {
            let mut flight = self.inner.flight();
            flight.waiters.push_back(sender);
            if flight.in_flight {
                debug!(
                    queue_depth = flight.waiters.len(),
                    "refresh already in flight, waiting"
                );
                false
            } else {
                flight.in_flight = true;
                true
            }
        };

        if lead {
            // Built before spawning so a task dropped unpolled still settles.
            let mut settle = Settle {
                inner: Arc::clone(&self.inner),
                outcome: None,
            };
            tokio::spawn(async move {
                let outcome = Arc::clone(&settle.inner).drive(ledger).await;
                settle.outcome = Some(outcome);
            });
        }

        receiver.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// Whether a refresh is currently running.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.inner.flight().in_flight
    }

    /// Callers waiting on the current refresh.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.inner.flight().waiters.len()
    }

    /// Number of refresh requests sent to the token service so far.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }
}
