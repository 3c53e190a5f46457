//! Test doubles for the session engine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokenguard_domain::{
    ApiRequest, ApiResponse, AuthRequest, AuthenticatedGrant, CodeChannel, CodePurpose, Identity,
    TokenGrant,
};
use tokio::sync::{Notify, Semaphore};

use crate::ports::{
    ApiTransport, AuthRemote, Clock, KeyValueStore, RemoteError, StorageError, TransportError,
};

/// Instant `secs` seconds after the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Token service double. Refresh `n` issues `access-n`/`refresh-n`.
#[derive(Default)]
pub struct FakeRemote {
    refresh_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    authenticate_calls: AtomicUsize,
    refresh_gate: Mutex<Option<Arc<Notify>>>,
    refresh_error: Mutex<Option<RemoteError>>,
    authenticate_error: Mutex<Option<RemoteError>>,
    revoke_error: Mutex<Option<RemoteError>>,
    ttls: Mutex<Option<(u64, u64)>>,
    panic_on_refresh: AtomicBool,
    sent_codes: Mutex<Vec<(CodeChannel, CodePurpose, String)>>,
    send_code_error: Mutex<Option<RemoteError>>,
}

impl FakeRemote {
    /// Makes every refresh wait for a permit on the returned `Notify`.
    pub fn hold_refreshes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.refresh_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_refresh_with(&self, error: RemoteError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    pub fn fail_authenticate_with(&self, error: RemoteError) {
        *self.authenticate_error.lock().unwrap() = Some(error);
    }

    pub fn fail_revoke_with(&self, error: RemoteError) {
        *self.revoke_error.lock().unwrap() = Some(error);
    }

    /// Makes every refresh panic after it has been counted.
    pub fn panic_on_refresh(&self) {
        self.panic_on_refresh.store(true, Ordering::SeqCst);
    }

    pub fn fail_send_code_with(&self, error: RemoteError) {
        *self.send_code_error.lock().unwrap() = Some(error);
    }

    pub fn sent_codes(&self) -> Vec<(CodeChannel, CodePurpose, String)> {
        self.sent_codes.lock().unwrap().clone()
    }

    /// Access and refresh lifetimes for issued grants.
    pub fn issue_ttls(&self, access: u64, refresh: u64) {
        *self.ttls.lock().unwrap() = Some((access, refresh));
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    fn grant(&self, n: usize) -> TokenGrant {
        let (access, refresh) = self.ttls.lock().unwrap().unwrap_or((900, 604_800));
        TokenGrant::new(format!("access-{n}"), format!("refresh-{n}"), access, refresh)
    }
}

#[async_trait]
impl AuthRemote for FakeRemote {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedGrant, RemoteError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.authenticate_error.lock().unwrap().clone() {
            return Err(error);
        }
        let principal = match request {
            AuthRequest::Login(credentials) => credentials.principal().to_string(),
            AuthRequest::Register(registration) => registration.principal().to_string(),
        };
        Ok(AuthenticatedGrant {
            identity: Identity::new("u1")
                .with_role("MERCHANT")
                .with_email(principal),
            tokens: self.grant(0),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, RemoteError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        assert!(
            !self.panic_on_refresh.load(Ordering::SeqCst),
            "refresh blew up"
        );
        if let Some(error) = self.refresh_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.grant(n))
    }

    async fn revoke(&self, _refresh_token: &str) -> Result<(), RemoteError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        self.revoke_error.lock().unwrap().clone().map_or(Ok(()), Err)
    }

    async fn send_code(
        &self,
        channel: CodeChannel,
        purpose: CodePurpose,
        target: &str,
    ) -> Result<(), RemoteError> {
        if let Some(error) = self.send_code_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.sent_codes
            .lock()
            .unwrap()
            .push((channel, purpose, target.to_string()));
        Ok(())
    }
}

/// Business API double.
///
/// Answers from a script of statuses first, then accepts any token listed
/// in `valid_tokens` and rejects everything else with 401.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<(ApiRequest, Option<String>)>>,
    script: Mutex<VecDeque<u16>>,
    valid_tokens: Mutex<Vec<String>>,
    data: Mutex<VecDeque<serde_json::Value>>,
}

impl FakeTransport {
    pub fn accepting(tokens: &[&str]) -> Self {
        let transport = Self::default();
        *transport.valid_tokens.lock().unwrap() = tokens.iter().map(ToString::to_string).collect();
        transport
    }

    pub fn push_status(&self, status: u16) {
        self.script.lock().unwrap().push_back(status);
    }

    /// `data` for the next successful reply; later ones fall back to `{"ok": true}`.
    pub fn push_data(&self, data: serde_json::Value) {
        self.data.lock().unwrap().push_back(data);
    }

    pub fn calls(&self) -> Vec<(ApiRequest, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tokens_sent(&self) -> Vec<Option<String>> {
        self.calls().into_iter().map(|(_, token)| token).collect()
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.clone(), access_token.map(String::from)));
        let scripted = self.script.lock().unwrap().pop_front();
        let status = scripted.unwrap_or_else(|| {
            let valid = self.valid_tokens.lock().unwrap();
            if access_token.is_some_and(|t| valid.iter().any(|v| v == t)) {
                200
            } else {
                401
            }
        });
        let body = if status == 200 {
            let data = self
                .data
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| serde_json::json!({"ok": true}));
            serde_json::json!({"success": true, "data": data, "code": 200, "message": "ok"})
        } else {
            serde_json::json!({"success": false, "data": null, "code": status, "message": format!("status {status}")})
        };
        Ok(ApiResponse::json_body(status, &body))
    }
}

/// Key-value store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    remove_gate: Mutex<Option<Arc<Semaphore>>>,
    removes_waiting: AtomicUsize,
}

impl MemoryStore {
    /// Makes every `remove` wait until the returned semaphore is closed.
    pub fn hold_removes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.remove_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Number of removes that reached the gate.
    pub fn removes_waiting(&self) -> usize {
        self.removes_waiting.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove_now(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let gate = self.remove_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.removes_waiting.fetch_add(1, Ordering::SeqCst);
            let _released = gate.acquire().await;
        }
        self.remove_now(key);
        Ok(())
    }
}
