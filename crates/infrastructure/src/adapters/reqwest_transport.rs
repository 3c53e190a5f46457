//! Business call transport using reqwest.
//!
//! This adapter implements the `ApiTransport` port. It resolves request
//! paths against the configured base URL and attaches the bearer token it
//! is handed; it never looks at session state itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tokenguard_application::ports::{ApiTransport, TransportError};
use tokenguard_domain::{ApiRequest, ApiResponse, HttpMethod, SessionConfig};
use tracing::debug;

const USER_AGENT: &str = concat!("Tokenguard/", env!("CARGO_PKG_VERSION"));

/// Builds the shared reqwest client.
pub(crate) fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

/// HTTP transport for business calls.
#[derive(Debug, Clone)]
pub struct ReqwestApiTransport {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl ReqwestApiTransport {
    /// Creates a transport for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: &SessionConfig) -> Result<Self, TransportError> {
        let client = http_client().map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a transport with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: Client, config: &SessionConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Resolves the request path and query against the base URL.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let raw = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let mut url =
            Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{e}: {raw}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            return TransportError::Connection(error.to_string());
        }
        if error.is_decode() || error.is_body() {
            return TransportError::InvalidBody(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl ApiTransport for ReqwestApiTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(Duration::from_millis(self.timeout_ms));

        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::InvalidBody(format!("failed to read body: {e}")))?
            .to_vec();

        debug!(status, bytes = body.len(), "business call completed");
        Ok(ApiResponse::new(status, body))
    }
}
