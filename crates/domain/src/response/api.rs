//! Business call responses and the backend's JSON envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StatusCode;

/// Raw response to an [`ApiRequest`](crate::request::ApiRequest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: impl Into<StatusCode>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: status.into(),
            body: body.into(),
        }
    }

    /// Creates a response whose body is the given JSON value.
    #[must_use]
    pub fn json_body(status: impl Into<StatusCode>, value: &Value) -> Self {
        Self::new(status, value.to_string().into_bytes())
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status.is_unauthorized()
    }

    /// Body decoded as UTF-8, lossy.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the whole body.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Decodes the `data` member of the response envelope.
    ///
    /// Bodies that are not enveloped are decoded as `T` directly.
    ///
    /// # Errors
    ///
    /// Returns the serde error if neither shape matches.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value: Value = self.json()?;
        match value {
            Value::Object(mut map) if map.contains_key("data") && map.contains_key("success") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                serde_json::from_value(data)
            }
            other => serde_json::from_value(other),
        }
    }

    /// Message to show for a failed call: the envelope's `message`, or the
    /// reason phrase when the body carries none.
    #[must_use]
    pub fn error_message(&self) -> String {
        serde_json::from_slice::<Envelope<Value>>(&self.body)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| self.status.reason_phrase().to_string())
    }
}

/// Standard backend response wrapper:
/// `{ success, data, code, message, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Whether the call succeeded.
    #[serde(default)]
    pub success: bool,
    /// Payload.
    #[serde(default)]
    pub data: Option<T>,
    /// Backend status code, usually mirrors HTTP.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Server timestamp, format varies by endpoint.
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl<T> Envelope<T> {
    /// Takes the payload of a successful envelope.
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}
