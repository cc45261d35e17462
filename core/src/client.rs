//! Generic CRUD client shared by every resource type.
//!
//! # Design
//! `ResourceClient` holds only immutable configuration, a shared transport
//! and a runtime handle; it carries no mutable state between calls and is
//! cheap to clone. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`, both pure. The async operations (`list`, `get_by_id`,
//! `create`, `update`, `delete_by_id`) chain build → transport → parse on a
//! spawned task and hand back an [`AsyncResult`] immediately.
//!
//! Mutations of existing resources take a [`Revision`]; the server decides
//! whether it is current and a stale one surfaces as
//! [`ApiError::Conflict`]. The client never retries.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::channel::{self, AsyncResult};
use crate::config::ResourceConfig;
use crate::correlation::CorrelationId;
use crate::error::{server_payload, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Payload, Query, ResourceId, Response, Revision};

type Parser<U> = fn(HttpResponse) -> Result<Response<U>, ApiError>;

/// CRUD surface for one resource type, decoding resources as `R` and
/// executing requests through `T`.
pub struct ResourceClient<R, T> {
    config: Arc<ResourceConfig>,
    transport: Arc<T>,
    runtime: Handle,
    _resource: PhantomData<fn() -> R>,
}

impl<R, T> Clone for ResourceClient<R, T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            runtime: self.runtime.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R, T> ResourceClient<R, T> {
    /// Build a client that spawns its calls on `runtime`.
    pub fn new(config: ResourceConfig, transport: Arc<T>, runtime: Handle) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            runtime,
            _resource: PhantomData,
        }
    }

    /// Build a client on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn on_current_runtime(
        config: ResourceConfig,
        transport: Arc<T>,
    ) -> Result<Self, TryCurrentError> {
        Ok(Self::new(config, transport, Handle::try_current()?))
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn build_list(&self, query: &Query, correlation_id: &CorrelationId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.config.collection_url(),
            query: query.to_pairs(),
            headers: self.headers(correlation_id, false),
            body: None,
        }
    }

    pub fn build_get(
        &self,
        id: &ResourceId,
        correlation_id: &CorrelationId,
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            path: self.item_url(id)?,
            query: Vec::new(),
            headers: self.headers(correlation_id, false),
            body: None,
        })
    }

    pub fn build_create(
        &self,
        payload: &Payload,
        correlation_id: &CorrelationId,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.config.collection_url(),
            query: Vec::new(),
            headers: self.headers(correlation_id, true),
            body: Some(body),
        })
    }

    /// The revision is merged into the body; a `revision` key already in
    /// `payload` is overwritten.
    pub fn build_update(
        &self,
        id: &ResourceId,
        revision: Revision,
        payload: &Payload,
        correlation_id: &CorrelationId,
    ) -> Result<HttpRequest, ApiError> {
        let mut body = payload.clone();
        body.insert("revision".to_string(), Value::from(revision.0));
        let body =
            serde_json::to_string(&body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.item_url(id)?,
            query: Vec::new(),
            headers: self.headers(correlation_id, true),
            body: Some(body),
        })
    }

    pub fn build_delete(
        &self,
        id: &ResourceId,
        revision: Revision,
        correlation_id: &CorrelationId,
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            path: self.item_url(id)?,
            query: vec![("revision".to_string(), revision.to_string())],
            headers: self.headers(correlation_id, false),
            body: None,
        })
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<Response<()>, ApiError> {
        parse_empty(response)
    }

    fn headers(&self, correlation_id: &CorrelationId, json_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![(
            self.config.correlation_header.clone(),
            correlation_id.to_string(),
        )];
        if json_body {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers
    }

    /// Collection URL plus the id as one percent-encoded path segment.
    ///
    /// Fails when the base URL cannot carry path segments (a bare
    /// `host:port` parses as a scheme), so a mutation never lands on the
    /// collection instead of the item.
    fn item_url(&self, id: &ResourceId) -> Result<String, ApiError> {
        let collection = self.config.collection_url();
        let unaddressable = || {
            ApiError::Validation(format!(
                "`{collection}` cannot address individual resources"
            ))
        };
        let mut url = url::Url::parse(&collection).map_err(|_| unaddressable())?;
        url.path_segments_mut()
            .map_err(|()| unaddressable())?
            .pop_if_empty()
            .push(&id.to_string());
        Ok(url.to_string())
    }
}

impl<R: DeserializeOwned, T> ResourceClient<R, T> {
    pub fn parse_list(&self, response: HttpResponse) -> Result<Response<Vec<R>>, ApiError> {
        decode(response)
    }

    pub fn parse_one(&self, response: HttpResponse) -> Result<Response<R>, ApiError> {
        decode(response)
    }
}

impl<R, T> ResourceClient<R, T>
where
    R: DeserializeOwned + Clone + Send + Sync + 'static,
    T: Transport,
{
    /// Fetch the collection filtered by `query`. An empty collection is a
    /// success.
    pub fn list(&self, query: Query, correlation_id: Option<CorrelationId>) -> AsyncResult<Vec<R>> {
        let correlation_id = CorrelationId::resolve(correlation_id);
        let request = self.build_list(&query, &correlation_id);
        self.dispatch(request, &correlation_id, decode::<Vec<R>>)
    }

    pub fn get_by_id(
        &self,
        id: impl Into<ResourceId>,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<R> {
        let correlation_id = CorrelationId::resolve(correlation_id);
        match self.build_get(&id.into(), &correlation_id) {
            Ok(request) => self.dispatch(request, &correlation_id, decode::<R>),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    /// Send `payload` as-is. Validation belongs to the caller.
    pub fn create(
        &self,
        payload: &Payload,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<R> {
        let correlation_id = CorrelationId::resolve(correlation_id);
        match self.build_create(payload, &correlation_id) {
            Ok(request) => self.dispatch(request, &correlation_id, decode::<R>),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    pub fn update(
        &self,
        id: impl Into<ResourceId>,
        revision: impl Into<Revision>,
        payload: &Payload,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<R> {
        let correlation_id = CorrelationId::resolve(correlation_id);
        match self.build_update(&id.into(), revision.into(), payload, &correlation_id) {
            Ok(request) => self.dispatch(request, &correlation_id, decode::<R>),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    pub fn delete_by_id(
        &self,
        id: impl Into<ResourceId>,
        revision: impl Into<Revision>,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<()> {
        let correlation_id = CorrelationId::resolve(correlation_id);
        match self.build_delete(&id.into(), revision.into(), &correlation_id) {
            Ok(request) => self.dispatch(request, &correlation_id, parse_empty),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    fn dispatch<U>(
        &self,
        request: HttpRequest,
        correlation_id: &CorrelationId,
        parse: Parser<U>,
    ) -> AsyncResult<U>
    where
        U: Send + Sync + 'static,
    {
        let (deferred, result) = channel::pair();
        let transport = Arc::clone(&self.transport);
        let span = tracing::debug_span!(
            "resource_call",
            resource = %self.config.type_tag,
            method = %request.method,
            correlation_id = %correlation_id,
        );

        let call = async move {
            tracing::debug!(url = %request.url(), "dispatching");
            let outcome = match transport.execute(request).await {
                Ok(response) => parse(response),
                Err(e) => Err(ApiError::from(e)),
            };
            match &outcome {
                Ok(response) => tracing::debug!(status = response.status, "completed"),
                Err(e) => tracing::warn!(status = e.status(), error = %e, "failed"),
            }
            deferred.settle(outcome);
        };
        self.runtime
            .spawn(call.instrument(span).with_current_subscriber());
        result
    }
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let status = response.status;
    let payload = server_payload(&response.body);
    Err(match status {
        404 => ApiError::NotFound { status, payload },
        409 | 412 => ApiError::Conflict { status, payload },
        _ => ApiError::Http { status, payload },
    })
}

fn decode<U: DeserializeOwned>(response: HttpResponse) -> Result<Response<U>, ApiError> {
    check_status(&response)?;
    let payload =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization {
            status: response.status,
            message: e.to_string(),
        })?;
    Ok(Response {
        payload,
        status: response.status,
    })
}

fn parse_empty(response: HttpResponse) -> Result<Response<()>, ApiError> {
    check_status(&response)?;
    Ok(Response {
        payload: (),
        status: response.status,
    })
}
