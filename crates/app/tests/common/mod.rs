//! Shared doubles for the session flow tests.
//!
//! `FakeBackend` plays both the token service and the business API, so
//! tokens it refreshes away stop being accepted by its endpoints.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use tokenguard_application::{
    ApiTransport, AuthRemote, Clock, RemoteError, TransportError,
};
use tokenguard_domain::{
    ApiRequest, ApiResponse, AuthRequest, AuthenticatedGrant, CodeChannel, CodePurpose, Identity,
    TokenGrant,
};
use tokio::sync::Notify;

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct Tokens {
    access: HashSet<String>,
    refresh: HashSet<String>,
    issued: usize,
}

/// In-process token service and API.
pub struct FakeBackend {
    tokens: Mutex<Tokens>,
    ttls: (u64, u64),
    hold: Mutex<Option<Arc<Notify>>>,
    reject_everything: Mutex<bool>,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    sent: Mutex<Vec<Option<String>>>,
    codes: Mutex<Vec<(CodeChannel, CodePurpose, String)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_ttls(900, 604_800)
    }

    pub fn with_ttls(access: u64, refresh: u64) -> Arc<Self> {
        Arc::new(Self {
            tokens: Mutex::new(Tokens::default()),
            ttls: (access, refresh),
            hold: Mutex::new(None),
            reject_everything: Mutex::new(false),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            codes: Mutex::new(Vec::new()),
        })
    }

    /// Accepts a pair that was issued before the backend was created.
    pub fn seed(&self, access: &str, refresh: &str) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.access.insert(access.to_string());
        tokens.refresh.insert(refresh.to_string());
    }

    /// Server-side expiry of every access token issued so far.
    pub fn expire_access_tokens(&self) {
        self.tokens.lock().unwrap().access.clear();
    }

    /// Answers 401 to every business call, even with fresh tokens.
    pub fn reject_everything(&self) {
        *self.reject_everything.lock().unwrap() = true;
    }

    /// Makes refreshes wait for a permit on the returned `Notify`.
    pub fn hold_refreshes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revokes(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    /// Tokens attached to business calls, in arrival order.
    pub fn sent(&self) -> Vec<Option<String>> {
        self.sent.lock().unwrap().clone()
    }

    /// Verification codes delivered so far.
    pub fn codes(&self) -> Vec<(CodeChannel, CodePurpose, String)> {
        self.codes.lock().unwrap().clone()
    }

    fn issue(&self) -> TokenGrant {
        let mut tokens = self.tokens.lock().unwrap();
        let n = tokens.issued;
        tokens.issued += 1;
        let grant = TokenGrant::new(
            format!("access-{n}"),
            format!("refresh-{n}"),
            self.ttls.0,
            self.ttls.1,
        );
        tokens.access.insert(grant.access_token.clone());
        tokens.refresh.insert(grant.refresh_token.clone());
        grant
    }
}

#[async_trait]
impl AuthRemote for FakeBackend {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedGrant, RemoteError> {
        let AuthRequest::Login(credentials) = request else {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "registration closed".to_string(),
            });
        };
        if credentials.principal() != "owner@example.com" {
            return Err(RemoteError::Rejected {
                status: 401,
                message: "invalid credentials".to_string(),
            });
        }
        Ok(AuthenticatedGrant {
            identity: Identity::new("u1")
                .with_role("MERCHANT")
                .with_email("owner@example.com"),
            tokens: self.issue(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RemoteError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(gate) = hold {
            gate.notified().await;
        }
        let known = self.tokens.lock().unwrap().refresh.remove(refresh_token);
        if !known {
            return Err(RemoteError::Rejected {
                status: 401,
                message: "refresh token revoked".to_string(),
            });
        }
        Ok(self.issue())
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), RemoteError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().refresh.remove(refresh_token);
        Ok(())
    }

    async fn send_code(
        &self,
        channel: CodeChannel,
        purpose: CodePurpose,
        target: &str,
    ) -> Result<(), RemoteError> {
        if purpose == CodePurpose::Register && target == "owner@example.com" {
            return Err(RemoteError::Rejected {
                status: 409,
                message: "email already registered".to_string(),
            });
        }
        self.codes
            .lock()
            .unwrap()
            .push((channel, purpose, target.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ApiTransport for FakeBackend {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push(access_token.map(str::to_string));
        let accepted = !*self.reject_everything.lock().unwrap()
            && access_token.is_some_and(|t| self.tokens.lock().unwrap().access.contains(t));
        if accepted && request.path.ends_with("/profile") {
            Ok(ApiResponse::json_body(
                200,
                &json!({"success": true, "code": 200, "data": {
                    "phone": "13800000000",
                    "hasPhone": true,
                    "phoneVerified": true,
                    "hasSecurityPassword": false
                }}),
            ))
        } else if accepted {
            Ok(ApiResponse::json_body(
                200,
                &json!({"success": true, "code": 200, "data": {"path": request.path}}),
            ))
        } else {
            Ok(ApiResponse::json_body(
                401,
                &json!({"success": false, "code": 401, "message": "token expired"}),
            ))
        }
    }
}
