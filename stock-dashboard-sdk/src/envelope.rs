//! The `{success, data, error}` wrapper every HTTP call resolves to.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{SdkError, SdkResult};

/// Normalized outcome of one HTTP call. `success` holds exactly when
/// `error` is absent; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    data: Option<Value>,
    error: Option<String>,
    #[serde(skip)]
    status: Option<u16>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: None,
        }
    }

    /// A failure that never reached the server.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            status: None,
        }
    }

    /// A failure carrying the non-2xx status the server answered with.
    pub fn http_failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::failure(message)
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn into_result(self) -> SdkResult<Value> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }

        let message = self.error.unwrap_or_else(|| "Request failed".to_string());
        Err(match self.status {
            Some(status) => SdkError::Api { status, message },
            None => SdkError::Transport(message),
        })
    }

    /// Converts and deserializes the payload in one step.
    pub fn decode<T: DeserializeOwned>(self) -> SdkResult<T> {
        let value = self.into_result()?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Picks the most specific human-readable message out of an error body:
/// the API's `detail`, the crawler's `error.message`, a bare `message`.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = value.get("detail") {
        return Some(match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }
    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }
    if let Some(Value::String(error)) = value.get("error") {
        return Some(error.clone());
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
