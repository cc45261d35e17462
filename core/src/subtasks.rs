//! Subtasks: the generic resource client bound to `/subtasks`.
//!
//! Adds the two scoped list filters and guards `create` with the subtask
//! field rules. Everything else is a pass-through to
//! [`ResourceClient`].

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::channel::AsyncResult;
use crate::client::ResourceClient;
use crate::config::ApiConfig;
use crate::correlation::CorrelationId;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{to_payload, NewSubtask, Payload, Query, Revision, Subtask, SubtaskPatch};
use crate::validation::{FieldKind, FieldRule, Validator};

pub const PATH: &str = "subtasks";
pub const TYPE_TAG: &str = "subtask";

/// Creation rules. The 255-character title limit is left to the server.
pub fn create_rules() -> Validator {
    Validator::new([
        FieldRule::required("task_id", FieldKind::Integer),
        FieldRule::required("title", FieldKind::String),
        FieldRule::optional("completed", FieldKind::Boolean),
    ])
    .non_empty()
}

pub struct Subtasks<T> {
    client: ResourceClient<Subtask, T>,
    validator: Validator,
}

impl<T> Clone for Subtasks<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<T: Transport> Subtasks<T> {
    pub fn new(api: &ApiConfig, transport: Arc<T>, runtime: Handle) -> Self {
        Self::from_client(ResourceClient::new(
            api.resource(PATH, TYPE_TAG),
            transport,
            runtime,
        ))
    }

    pub fn from_client(client: ResourceClient<Subtask, T>) -> Self {
        Self {
            client,
            validator: create_rules(),
        }
    }

    pub fn client(&self) -> &ResourceClient<Subtask, T> {
        &self.client
    }

    /// Subtasks of every task in a list. `completed` defaults to `false`.
    pub fn for_list(
        &self,
        list_id: u64,
        completed: Option<bool>,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Vec<Subtask>> {
        let query = Query::new()
            .with("list_id", list_id)
            .with("completed_tasks", completed.unwrap_or(false));
        self.client.list(query, correlation_id)
    }

    /// Subtasks of one parent task. `completed` defaults to `false`.
    pub fn for_task(
        &self,
        task_id: u64,
        completed: Option<bool>,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Vec<Subtask>> {
        let query = Query::new()
            .with("task_id", task_id)
            .with("completed_tasks", completed.unwrap_or(false));
        self.client.list(query, correlation_id)
    }

    pub fn get_by_id(
        &self,
        id: u64,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Subtask> {
        self.client.get_by_id(id, correlation_id)
    }

    /// Validate `payload`, then create. A payload that fails validation is
    /// rejected with status 0 and never reaches the transport.
    pub fn create(
        &self,
        payload: &Payload,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Subtask> {
        if let Err(message) = self.validator.validate(payload) {
            tracing::debug!(resource = TYPE_TAG, %message, "create rejected locally");
            return AsyncResult::rejected(ApiError::Validation(message));
        }
        self.client.create(payload, correlation_id)
    }

    pub fn create_new(
        &self,
        subtask: &NewSubtask,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Subtask> {
        match to_payload(subtask) {
            Ok(payload) => self.create(&payload, correlation_id),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    pub fn update(
        &self,
        id: u64,
        revision: impl Into<Revision>,
        payload: &Payload,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Subtask> {
        self.client.update(id, revision, payload, correlation_id)
    }

    pub fn patch(
        &self,
        id: u64,
        revision: impl Into<Revision>,
        patch: &SubtaskPatch,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<Subtask> {
        match to_payload(patch) {
            Ok(payload) => self.update(id, revision, &payload, correlation_id),
            Err(e) => AsyncResult::rejected(e),
        }
    }

    pub fn delete_by_id(
        &self,
        id: u64,
        revision: impl Into<Revision>,
        correlation_id: Option<CorrelationId>,
    ) -> AsyncResult<()> {
        self.client.delete_by_id(id, revision, correlation_id)
    }
}
