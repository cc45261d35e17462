//! Blocking HTTP transport built on ureq.
//!
//! Each request runs on tokio's blocking pool so the async caller never
//! waits on socket I/O. The agent is configured with
//! `http_status_as_error(false)`: 4xx/5xx responses come back as data and
//! the resource client classifies them.

use std::fmt;
use std::time::Duration;

use super::{Transport, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Authentication headers attached to every request.
#[derive(Clone)]
pub struct Session {
    client_id: String,
    access_token: String,
}

impl Session {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("x-client-id".to_string(), self.client_id.clone()),
            ("x-access-token".to_string(), self.access_token.clone()),
        ]
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    session: Session,
}

impl UreqTransport {
    pub fn new(session: Session) -> Self {
        Self::build(session, None)
    }

    /// Bound every request (connect, send and receive) by `timeout`.
    pub fn with_timeout(session: Session, timeout: Duration) -> Self {
        Self::build(session, Some(timeout))
    }

    fn build(session: Session, timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent, session }
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        request.headers.extend(self.session.headers());
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || send(&agent, &request))
            .await
            .map_err(|e| TransportError::new(format!("transport task failed: {e}")))?
    }
}

fn send(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let url = request.url();
    tracing::trace!(method = %request.method, %url, "sending request");

    let result = match (request.method, request.body.as_deref()) {
        (HttpMethod::Get, _) => with_headers(agent.get(&url), &request.headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(&url), &request.headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(&url), &request.headers).send(body.as_bytes())
        }
        (HttpMethod::Post, None) => with_headers(agent.post(&url), &request.headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(&url), &request.headers).send(body.as_bytes())
        }
        (HttpMethod::Put, None) => with_headers(agent.put(&url), &request.headers).send_empty(),
    };
    let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError::with_status(status, format!("failed to read body: {e}")))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
