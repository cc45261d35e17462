//! Domain types shared by every resource, plus the subtask DTOs.
//!
//! # Design
//! Identifiers and revisions are newtypes so an id can never be passed where
//! a revision is expected. Payloads stay as JSON maps because validation
//! rules and partial updates operate on field presence, which typed structs
//! would erase. The subtask DTOs mirror the mock-server schema but are
//! defined independently; integration tests catch schema drift.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Field map sent as a create or update body.
pub type Payload = Map<String, Value>;

/// Server-assigned identifier, unique within a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Int(u64),
    Str(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Int(id) => write!(f, "{id}"),
            ResourceId::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        ResourceId::Int(id)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId::Str(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId::Str(id)
    }
}

/// Optimistic-concurrency token. Must match the server's current revision
/// for an update or delete to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Revision {
    fn from(revision: u64) -> Self {
        Revision(revision)
    }
}

/// Success half of an operation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub payload: T,
    pub status: u16,
}

/// Query filters for a list call. Kept sorted so requests are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(BTreeMap<String, String>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

/// A subtask as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub revision: Revision,
    #[serde(rename = "type", default = "subtask_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<u64>,
}

fn subtask_type() -> String {
    "subtask".to_string()
}

/// Creation body for a subtask. The title limit of 255 characters is
/// enforced by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubtask {
    pub task_id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Partial update for a subtask. Only the fields present are applied;
/// omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Convert a serializable DTO into a field map.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload, ApiError> {
    match serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resource_id_displays_without_quotes() {
        assert_eq!(ResourceId::from(42).to_string(), "42");
        assert_eq!(ResourceId::from("abc").to_string(), "abc");
    }

    #[test]
    fn resource_id_deserializes_either_kind() {
        let int: ResourceId = serde_json::from_value(json!(7)).unwrap();
        let string: ResourceId = serde_json::from_value(json!("x7")).unwrap();
        assert_eq!(int, ResourceId::Int(7));
        assert_eq!(string, ResourceId::Str("x7".to_string()));
    }

    #[test]
    fn query_is_sorted_by_key() {
        let query = Query::new().with("list_id", 9).with("completed_tasks", false);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("completed_tasks".to_string(), "false".to_string()),
                ("list_id".to_string(), "9".to_string()),
            ]
        );
    }

    #[test]
    fn subtask_defaults_type_and_optional_fields() {
        let subtask: Subtask = serde_json::from_value(json!({
            "id": 1, "task_id": 2, "title": "t", "revision": 3
        }))
        .unwrap();
        assert_eq!(subtask.kind, "subtask");
        assert!(!subtask.completed);
        assert_eq!(subtask.revision, Revision(3));
        assert!(subtask.created_at.is_none());
    }

    #[test]
    fn new_subtask_omits_unset_completed() {
        let payload = to_payload(&NewSubtask {
            task_id: 5,
            title: "Buy milk".to_string(),
            completed: None,
        })
        .unwrap();
        assert_eq!(Value::Object(payload), json!({ "task_id": 5, "title": "Buy milk" }));
    }

    #[test]
    fn empty_patch_is_empty_payload() {
        let payload = to_payload(&SubtaskPatch::default()).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn non_object_is_rejected() {
        let err = to_payload(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
