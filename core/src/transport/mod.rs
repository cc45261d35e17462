//! Transport abstraction for the resource client.
//!
//! Defines the [`Transport`] trait the client executes requests through.
//! Implementations own everything network-related, including attaching
//! authentication; the client itself holds no credentials.
//!
//! - [`http::UreqTransport`]: blocking HTTP via ureq, run off the async runtime
//! - [`recording::RecordingTransport`]: in-process scripted transport for tests

pub mod http;
pub mod recording;

use std::future::Future;

use crate::http::{HttpRequest, HttpResponse};

/// Failure to obtain any server response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Status reported by the transport, 0 when there is none.
    pub status: u16,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Executes plain-data HTTP requests.
///
/// Non-2xx responses are data (`Ok(HttpResponse)`), not errors; `Err` is
/// reserved for failures where no response was obtained. Implementations
/// perform each request exactly once; retry policy, if any, belongs here
/// and not in the client.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
