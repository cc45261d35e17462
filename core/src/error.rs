//! Error types for the resource client.
//!
//! # Design
//! `NotFound` and `Conflict` get dedicated variants because callers react to
//! them differently: a missing resource is usually terminal, a stale revision
//! means "re-read and decide". All other non-2xx responses land in `Http`.
//!
//! Every variant can be viewed as the same two values, an error payload of
//! the form `{"errors": [..]}` and a status code, via [`ApiError::payload`]
//! and [`ApiError::status`]. Status 0 marks failures that happened before
//! any response was received.

use serde_json::{json, Value};

use crate::transport::TransportError;

/// Errors delivered through the failure branch of an
/// [`AsyncResult`](crate::channel::AsyncResult).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The payload failed local pre-flight checks; no request was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server has no resource with the requested identifier.
    #[error("resource not found (HTTP {status})")]
    NotFound { status: u16, payload: Value },

    /// The supplied revision is stale. Re-read the resource to obtain the
    /// current revision before retrying.
    #[error("revision conflict (HTTP {status})")]
    Conflict { status: u16, payload: Value },

    /// The server returned a non-2xx status other than not-found/conflict.
    #[error("HTTP {status}: {payload}")]
    Http { status: u16, payload: Value },

    /// No server response was obtained.
    #[error("transport error: {message}")]
    Transport { status: u16, message: String },

    /// A 2xx response body could not be decoded into the expected type.
    #[error("deserialization failed: {message}")]
    Deserialization { status: u16, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status associated with the failure, or 0 when no response exists.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::Serialization(_) => 0,
            ApiError::NotFound { status, .. }
            | ApiError::Conflict { status, .. }
            | ApiError::Http { status, .. }
            | ApiError::Transport { status, .. }
            | ApiError::Deserialization { status, .. } => *status,
        }
    }

    /// Error payload in the wire shape `{"errors": [..]}`. Server payloads are
    /// returned verbatim.
    pub fn payload(&self) -> Value {
        match self {
            ApiError::NotFound { payload, .. }
            | ApiError::Conflict { payload, .. }
            | ApiError::Http { payload, .. } => payload.clone(),
            ApiError::Validation(message)
            | ApiError::Serialization(message)
            | ApiError::Transport { message, .. }
            | ApiError::Deserialization { message, .. } => errors_payload(message),
        }
    }

    /// The human-readable messages of the `errors` array.
    pub fn errors(&self) -> Vec<String> {
        match self.payload().get("errors").and_then(Value::as_array) {
            Some(errors) => errors
                .iter()
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ApiError::Validation(_) | ApiError::Serialization(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        ApiError::Transport {
            status: e.status,
            message: e.message,
        }
    }
}

/// Build `{"errors": [message]}`.
pub fn errors_payload(message: &str) -> Value {
    json!({ "errors": [message] })
}

/// Interpret a server error body. JSON bodies are kept as-is; anything else
/// is wrapped so the `errors` shape holds for every failure.
pub(crate) fn server_payload(body: &str) -> Value {
    if body.trim().is_empty() {
        return json!({ "errors": [] });
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => errors_payload(body),
    }
}
