//! Authenticated resource client for the task API.
//!
//! # Overview
//! [`ResourceClient`] is a generic CRUD surface (list, get, create, update,
//! delete) over one REST resource. Concrete resources wrap it; [`Subtasks`]
//! is the one shipped here. Every operation returns an [`AsyncResult`]
//! immediately and settles it exactly once with either `(payload, status)`
//! or an [`ApiError`] carrying `(error payload, status)`.
//!
//! # Design
//! - The client holds only immutable configuration; credentials and I/O
//!   live behind the [`Transport`] trait.
//! - Requests are built and responses parsed as plain data (`build_*` /
//!   `parse_*`), so both halves are testable without a network.
//! - Updates and deletes take a [`Revision`]; stale revisions come back as
//!   [`ApiError::Conflict`] and are never retried.
//! - Every request carries a [`CorrelationId`], supplied or generated.

pub mod channel;
pub mod client;
pub mod config;
pub mod correlation;
pub mod error;
pub mod http;
pub mod subtasks;
pub mod transport;
pub mod types;
pub mod validation;

pub use channel::{AsyncResult, Deferred, Outcome};
pub use client::ResourceClient;
pub use config::{ApiConfig, ConfigError, ResourceConfig};
pub use correlation::CorrelationId;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use subtasks::Subtasks;
pub use transport::http::{Session, UreqTransport};
pub use transport::recording::RecordingTransport;
pub use transport::{Transport, TransportError};
pub use types::{
    NewSubtask, Payload, Query, ResourceId, Response, Revision, Subtask, SubtaskPatch,
};
pub use validation::{FieldKind, FieldRule, Validator};
