//! Token service client over HTTP.
//!
//! Talks to the merchant auth endpoints under `authBasePath`:
//! - `POST /login`, `/login/phone-code`, `/login/email-code`
//! - `POST /register`, `/register/phone-code`, `/register/email-code`
//! - `POST /refresh` and `POST /logout` with `{ "refreshToken": ... }`
//! - `POST /send-sms-code`, `/send-email-code` for registration codes
//!
//! Login codes go to the shared `/sms/send-code` and `/email/send-code`
//! endpoints at the API root instead.
//!
//! Every reply is wrapped in the `{ success, data, code, message }`
//! envelope; a non-2xx reply's `message` becomes the error text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokenguard_application::ports::{AuthRemote, RemoteError};
use tokenguard_domain::{
    ApiResponse, AuthRequest, AuthenticatedGrant, CodeChannel, CodePurpose, Credentials, Identity,
    Registration, SessionConfig, TokenGrant,
};
use tracing::debug;

use super::reqwest_transport::http_client;

/// Login/register payload. Older backends nest the tokens, newer ones
/// put them next to `user`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireAuthenticated {
    Nested {
        user: Identity,
        tokens: TokenGrant,
    },
    Flat {
        user: Identity,
        #[serde(flatten)]
        tokens: TokenGrant,
    },
}

impl From<WireAuthenticated> for AuthenticatedGrant {
    fn from(wire: WireAuthenticated) -> Self {
        match wire {
            WireAuthenticated::Nested { user, tokens } | WireAuthenticated::Flat { user, tokens } => {
                Self {
                    identity: user,
                    tokens,
                }
            }
        }
    }
}

/// [`AuthRemote`] backed by the HTTP auth API.
#[derive(Debug, Clone)]
pub struct HttpAuthRemote {
    client: Client,
    config: SessionConfig,
}

impl HttpAuthRemote {
    /// Creates a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: SessionConfig) -> Result<Self, RemoteError> {
        let client = http_client().map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, config: SessionConfig) -> Self {
        Self { client, config }
    }

    /// Endpoint suffix for an authenticate request.
    const fn route(request: &AuthRequest) -> &'static str {
        match request {
            AuthRequest::Login(Credentials::Password { .. }) => "login",
            AuthRequest::Login(Credentials::PhoneCode { .. }) => "login/phone-code",
            AuthRequest::Login(Credentials::EmailCode { .. }) => "login/email-code",
            AuthRequest::Register(Registration::Password { .. }) => "register",
            AuthRequest::Register(Registration::PhoneCode { .. }) => "register/phone-code",
            AuthRequest::Register(Registration::EmailCode { .. }) => "register/email-code",
        }
    }

    /// JSON body for an authenticate request.
    fn body(request: &AuthRequest) -> Value {
        match request {
            AuthRequest::Login(Credentials::Password {
                identifier,
                password,
            }) => json!({ "identifier": identifier, "password": password }),
            AuthRequest::Login(Credentials::PhoneCode { phone, code })
            | AuthRequest::Register(Registration::PhoneCode { phone, code }) => {
                json!({ "phone": phone, "code": code })
            }
            AuthRequest::Login(Credentials::EmailCode { email, code })
            | AuthRequest::Register(Registration::EmailCode { email, code }) => {
                json!({ "email": email, "code": code })
            }
            AuthRequest::Register(Registration::Password {
                email,
                phone,
                username,
                password,
            }) => {
                let mut body = json!({ "password": password });
                for (name, value) in [("email", email), ("phone", phone), ("username", username)] {
                    if let Some(value) = value {
                        body[name] = json!(value);
                    }
                }
                body
            }
        }
    }

    /// URL a verification code request is posted to.
    fn code_url(&self, channel: CodeChannel, purpose: CodePurpose) -> String {
        match (purpose, channel) {
            (CodePurpose::General, CodeChannel::Sms) => self.config.endpoint("sms/send-code"),
            (CodePurpose::General, CodeChannel::Email) => self.config.endpoint("email/send-code"),
            (CodePurpose::Register, CodeChannel::Sms) => self.config.auth_endpoint("send-sms-code"),
            (CodePurpose::Register, CodeChannel::Email) => {
                self.config.auth_endpoint("send-email-code")
            }
        }
    }

    fn code_body(channel: CodeChannel, target: &str) -> Value {
        match channel {
            CodeChannel::Sms => json!({ "phone": target }),
            CodeChannel::Email => json!({ "email": target }),
        }
    }

    async fn post<T: DeserializeOwned>(&self, suffix: &str, body: &Value) -> Result<T, RemoteError> {
        self.post_url(&self.config.auth_endpoint(suffix), body).await
    }

    async fn post_url<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T, RemoteError> {
        let timeout_ms = self.config.request_timeout_ms;
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_millis(timeout_ms))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout { timeout_ms }
                } else {
                    RemoteError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(format!("failed to read body: {e}")))?;
        debug!(%url, status, "auth endpoint replied");

        decode_reply(&ApiResponse::new(status, bytes.to_vec()))
    }
}

/// Turns an auth endpoint reply into its payload or a [`RemoteError`].
fn decode_reply<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, RemoteError> {
    if !response.is_success() {
        return Err(RemoteError::Rejected {
            status: response.status.as_u16(),
            message: response.error_message(),
        });
    }
    response
        .data()
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl AuthRemote for HttpAuthRemote {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedGrant, RemoteError> {
        let wire: WireAuthenticated = self.post(Self::route(request), &Self::body(request)).await?;
        Ok(wire.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RemoteError> {
        self.post("refresh", &json!({ "refreshToken": refresh_token }))
            .await
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), RemoteError> {
        let _: Value = self
            .post("logout", &json!({ "refreshToken": refresh_token }))
            .await?;
        Ok(())
    }

    async fn send_code(
        &self,
        channel: CodeChannel,
        purpose: CodePurpose,
        target: &str,
    ) -> Result<(), RemoteError> {
        let _: Value = self
            .post_url(
                &self.code_url(channel, purpose),
                &Self::code_body(channel, target),
            )
            .await?;
        Ok(())
    }
}
