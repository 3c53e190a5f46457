//! Authorized business calls.
//!
//! [`AuthorizedClient`] wraps an [`ApiTransport`] with the request gate on
//! the way out and response recovery on the way back.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokenguard_domain::{ApiRequest, ApiResponse, Identity, IdentityPatch, generate_call_id};
use tracing::{Instrument, debug, info, info_span};

use super::gate::RequestGate;
use super::recovery::{CallAttempt, Recovery, ResponseRecovery};
use super::session::AuthSession;
use crate::error::{SessionError, SessionResult};
use crate::ports::{ApiTransport, TransportError};

/// Sends business calls on behalf of a session.
#[derive(Clone)]
pub struct AuthorizedClient {
    session: AuthSession,
    transport: Arc<dyn ApiTransport>,
    gate: RequestGate,
    recovery: ResponseRecovery,
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl AuthorizedClient {
    /// Creates a client for `session` over `transport`.
    #[must_use]
    pub fn new(session: AuthSession, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            gate: RequestGate::new(session.clone()),
            recovery: ResponseRecovery::new(session.clone()),
            session,
        }
    }

    /// Sends `request` and returns the 2xx response.
    ///
    /// # Errors
    /// - [`SessionError::SessionExpired`] if the session lapsed before sending.
    /// - [`SessionError::Unauthorized`] if the call was still rejected after
    ///   one refresh and retry.
    /// - [`SessionError::Api`] for any other non-2xx status.
    /// - [`SessionError::Transport`] when no response arrived.
    pub async fn execute(&self, request: &ApiRequest) -> SessionResult<ApiResponse> {
        let span = info_span!(
            "call",
            call_id = %generate_call_id(),
            method = %request.method,
            path = %request.path,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: &ApiRequest) -> SessionResult<ApiResponse> {
        let mut access_token = self.gate.authorize().await?;
        let mut attempt = CallAttempt::default();

        loop {
            let response = self
                .transport
                .send(request, access_token.as_deref())
                .await?;
            debug!(status = response.status.as_u16(), retried = attempt.is_retried(), "response received");

            if response.is_unauthorized() {
                match self.recovery.on_unauthorized(&mut attempt, &response).await {
                    Recovery::Retry {
                        access_token: fresh,
                    } => {
                        access_token = Some(fresh);
                        continue;
                    }
                    Recovery::Fail(error) => return Err(error),
                }
            }

            if response.is_success() {
                return Ok(response);
            }
            return Err(SessionError::Api {
                status: response.status.as_u16(),
                message: response.error_message(),
            });
        }
    }

    /// Sends `request` and decodes the envelope's `data` as `T`.
    ///
    /// # Errors
    /// Everything [`AuthorizedClient::execute`] returns, plus
    /// [`TransportError::InvalidBody`] when `data` does not decode.
    pub async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> SessionResult<T> {
        let response = self.execute(request).await?;
        response
            .data()
            .map_err(|e| SessionError::Transport(TransportError::InvalidBody(e.to_string())))
    }

    /// Fetches the profile at `profile_path` and merges it into the
    /// session's identity, which is persisted.
    ///
    /// # Errors
    /// Everything [`AuthorizedClient::call`] returns, and
    /// [`SessionError::SessionExpired`] when anonymous or if the session
    /// ended while the profile was in flight.
    pub async fn refresh_identity(&self, profile_path: &str) -> SessionResult<Identity> {
        if !self.session.is_authenticated().await {
            return Err(SessionError::SessionExpired);
        }
        let profile: BTreeMap<String, serde_json::Value> =
            self.call(&ApiRequest::get(profile_path)).await?;
        let identity = self
            .session
            .update_identity(IdentityPatch::from_profile(profile))
            .await
            .ok_or(SessionError::SessionExpired)?;
        info!(user_id = %identity.id, "identity refreshed from profile");
        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::testing::{FakeRemote, FakeTransport, ManualClock, MemoryStore, at};
    use crate::auth::{SessionOptions, TokenStore};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tokenguard_domain::{Credentials, SnapshotLayout, StorageKeys};

    async fn client_with(
        transport: FakeTransport,
    ) -> (AuthorizedClient, Arc<FakeTransport>, Arc<FakeRemote>) {
        let remote = Arc::new(FakeRemote::default());
        let store = TokenStore::new(
            Arc::new(MemoryStore::default()),
            StorageKeys::new("test"),
            SnapshotLayout::Split,
        );
        let session = AuthSession::new(
            remote.clone(),
            store,
            Arc::new(ManualClock::at(at(10))),
            SessionOptions::default(),
        );
        session.login(Credentials::password("o", "p")).await.unwrap();
        let transport = Arc::new(transport);
        (AuthorizedClient::new(session, transport.clone()), transport, remote)
    }

    #[tokio::test]
    async fn test_success_decodes_envelope_data() {
        let (client, transport, _) = client_with(FakeTransport::accepting(&["access-0"])).await;

        let data: Value = client.call(&ApiRequest::get("/merchant/hotels")).await.unwrap();

        assert_eq!(data, json!({"ok": true}));
        assert_eq!(transport.tokens_sent(), vec![Some("access-0".to_string())]);
    }

    #[tokio::test]
    async fn test_401_is_retried_once_with_fresh_token() {
        let (client, transport, remote) = client_with(FakeTransport::accepting(&["access-1"])).await;

        let request = ApiRequest::post("/merchant/rooms", json!({"number": 12}));
        client.execute(&request).await.unwrap();

        assert_eq!(
            transport.tokens_sent(),
            vec![Some("access-0".to_string()), Some("access-1".to_string())]
        );
        let calls = transport.calls();
        assert_eq!(calls[0].0, calls[1].0);
        assert_eq!(remote.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_persistent_401_stops_after_one_retry() {
        let (client, transport, _) = client_with(FakeTransport::accepting(&[])).await;

        let error = client.execute(&ApiRequest::get("/merchant/me")).await.unwrap_err();

        assert!(matches!(error, SessionError::Unauthorized { status: 401, .. }));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_carry_server_message() {
        let transport = FakeTransport::accepting(&["access-0"]);
        transport.push_status(409);
        let (client, _, remote) = client_with(transport).await;

        let error = client.execute(&ApiRequest::delete("/merchant/rooms/3")).await.unwrap_err();

        match error {
            SessionError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "status 409");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(remote.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_identity_merges_profile() {
        let transport = FakeTransport::accepting(&["access-0"]);
        transport.push_data(json!({
            "phone": "13800000000",
            "hasPhone": true,
            "phoneVerified": false,
            "hasSecurityPassword": true
        }));
        let (client, transport, _) = client_with(transport).await;

        let identity = client.refresh_identity("/merchant/auth/profile").await.unwrap();

        assert_eq!(identity.id, "u1");
        assert_eq!(identity.email.as_deref(), Some("o"));
        assert_eq!(identity.phone.as_deref(), Some("13800000000"));
        assert_eq!(identity.attributes.get("hasSecurityPassword"), Some(&json!(true)));
        assert_eq!(client.session.identity().await.unwrap(), identity);
        assert_eq!(transport.calls()[0].0.path, "/merchant/auth/profile");
    }

    #[tokio::test]
    async fn test_refresh_identity_after_logout_is_expired() {
        let (client, transport, _) = client_with(FakeTransport::accepting(&["access-0"])).await;
        client.session.logout().await;

        let error = client.refresh_identity("/merchant/auth/profile").await.unwrap_err();

        assert!(matches!(error, SessionError::SessionExpired));
        assert!(transport.calls().is_empty());
    }
}
