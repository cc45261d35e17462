//! Per-request correlation identifiers.
//!
//! Every outbound request carries one, either supplied by the caller (to
//! tie retries of the same logical operation together on the server) or
//! generated fresh for the call. Ids are never stored by the client.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default header used to transmit the correlation id.
pub const DEFAULT_HEADER: &str = "x-client-request-id";

/// Opaque tracing/idempotency token for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id, unique per call.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The caller's id when supplied, otherwise a generated one.
    pub fn resolve(supplied: Option<CorrelationId>) -> Self {
        supplied.unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
