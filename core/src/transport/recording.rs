//! Scripted in-process transport.
//!
//! [`RecordingTransport`] answers every request with a caller-supplied
//! responder closure and keeps a copy of each request it saw, so tests can
//! assert both on what the client sent and on how many calls were made.
//! An optional latency function delays individual responses to shuffle
//! completion order.

use std::time::Duration;

use parking_lot::Mutex;

use super::{Transport, TransportError};
use crate::http::{HttpRequest, HttpResponse};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;
type Latency = dyn Fn(&HttpRequest) -> Duration + Send + Sync;

pub struct RecordingTransport {
    responder: Box<Responder>,
    latency: Option<Box<Latency>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A transport that answers every request with the same status and body.
    pub fn fixed(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    /// Delay each response by `latency(request)`.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&HttpRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(&request)).await;
        }
        (self.responder)(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn request(path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn records_requests_in_call_order() {
        let transport = RecordingTransport::fixed(200, "[]");
        transport.execute(request("/a")).await.unwrap();
        transport.execute(request("/b")).await.unwrap();

        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn responder_sees_the_request() {
        let transport = RecordingTransport::new(|req| {
            if req.path.ends_with("/missing") {
                Err(TransportError::new("unreachable"))
            } else {
                Ok(HttpResponse::new(200, req.path.clone()))
            }
        });
        assert_eq!(transport.execute(request("/x")).await.unwrap().body, "/x");
        let err = transport.execute(request("/missing")).await.unwrap_err();
        assert_eq!(err.status, 0);
    }
}
