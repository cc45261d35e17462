//! In-memory subtasks service for exercising the client over real HTTP.
//!
//! Mirrors the wire contract of the production API closely enough for
//! integration tests: integer ids, revisions that bump on every update,
//! 409 on stale revisions, and `{"errors": [..]}` bodies on every failure.
//! The `x-client-request-id` header is echoed back on every response.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const REQUEST_ID_HEADER: &str = "x-client-request-id";
pub const MAX_TITLE_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    pub completed: bool,
    pub revision: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug)]
pub struct Store {
    next_id: u64,
    subtasks: BTreeMap<u64, Subtask>,
    /// task id -> list id
    task_lists: HashMap<u64, u64>,
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (status, Json(json!({ "errors": [message.into()] })))
}

fn not_found(id: u64) -> Failure {
    failure(StatusCode::NOT_FOUND, format!("subtask {id} not found"))
}

fn conflict(current: u64) -> Failure {
    (
        StatusCode::CONFLICT,
        Json(json!({ "errors": ["revision conflict"], "revision": current })),
    )
}

/// A service with no tasks; every create fails until tasks exist.
pub fn app() -> Router {
    app_with_tasks(&[])
}

/// A service whose tasks are given as `(task_id, list_id)` pairs.
pub fn app_with_tasks(tasks: &[(u64, u64)]) -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        next_id: 1,
        subtasks: BTreeMap::new(),
        task_lists: tasks.iter().copied().collect(),
    }));
    Router::new()
        .route("/subtasks", get(list_subtasks).post(create_subtask))
        .route(
            "/subtasks/{id}",
            get(get_subtask).put(update_subtask).delete(delete_subtask),
        )
        .layer(middleware::from_fn(echo_request_id))
        .with_state(db)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn echo_request_id(request: Request, next: Next) -> Response {
    let request_id = request.headers().get(REQUEST_ID_HEADER).cloned();
    let mut response = next.run(request).await;
    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub list_id: Option<u64>,
    pub task_id: Option<u64>,
    #[serde(default)]
    pub completed_tasks: bool,
}

async fn list_subtasks(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subtask>>, Failure> {
    if params.list_id.is_some() == params.task_id.is_some() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "exactly one of list_id or task_id is required",
        ));
    }
    let store = db.read().await;
    let in_scope = |subtask: &Subtask| match (params.list_id, params.task_id) {
        (Some(list_id), None) => store.task_lists.get(&subtask.task_id) == Some(&list_id),
        (None, Some(task_id)) => subtask.task_id == task_id,
        _ => false,
    };
    Ok(Json(
        store
            .subtasks
            .values()
            .filter(|s| in_scope(s) && s.completed == params.completed_tasks)
            .cloned()
            .collect(),
    ))
}

fn title_field(body: &Value, required: bool) -> Result<Option<String>, Failure> {
    match body.get("title") {
        None | Some(Value::Null) if required => Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "title is required",
        )),
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(title)) if title.chars().count() > MAX_TITLE_LEN => Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("title must be at most {MAX_TITLE_LEN} characters"),
        )),
        Some(Value::String(title)) => Ok(Some(title.clone())),
        _ => Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "title must be a string",
        )),
    }
}

fn completed_field(body: &Value) -> Result<Option<bool>, Failure> {
    match body.get("completed") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(completed)) => Ok(Some(*completed)),
        Some(_) => Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "completed must be a boolean",
        )),
    }
}

fn revision_field(revision: Option<u64>) -> Result<u64, Failure> {
    revision.ok_or_else(|| failure(StatusCode::UNPROCESSABLE_ENTITY, "revision is required"))
}

async fn create_subtask(
    State(db): State<Db>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Subtask>), Failure> {
    let task_id = body.get("task_id").and_then(Value::as_u64).ok_or_else(|| {
        failure(StatusCode::UNPROCESSABLE_ENTITY, "task_id must be an integer")
    })?;
    let title = title_field(&body, true)?.unwrap_or_default();
    let completed = completed_field(&body)?.unwrap_or(false);

    let mut store = db.write().await;
    if !store.task_lists.contains_key(&task_id) {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("task {task_id} does not exist"),
        ));
    }
    let subtask = Subtask {
        id: store.next_id,
        task_id,
        title,
        completed,
        revision: 1,
        kind: "subtask".to_string(),
    };
    store.next_id += 1;
    store.subtasks.insert(subtask.id, subtask.clone());
    tracing::debug!(id = subtask.id, task_id, "subtask created");
    Ok((StatusCode::CREATED, Json(subtask)))
}

async fn get_subtask(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Subtask>, Failure> {
    let store = db.read().await;
    store.subtasks.get(&id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn update_subtask(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<Subtask>, Failure> {
    let revision = revision_field(body.get("revision").and_then(Value::as_u64))?;
    let title = title_field(&body, false)?;
    let completed = completed_field(&body)?;

    let mut store = db.write().await;
    let subtask = store.subtasks.get_mut(&id).ok_or_else(|| not_found(id))?;
    if subtask.revision != revision {
        return Err(conflict(subtask.revision));
    }
    if let Some(title) = title {
        subtask.title = title;
    }
    if let Some(completed) = completed {
        subtask.completed = completed;
    }
    subtask.revision += 1;
    Ok(Json(subtask.clone()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub revision: Option<u64>,
}

async fn delete_subtask(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, Failure> {
    let revision = revision_field(params.revision)?;
    let mut store = db.write().await;
    let current = store.subtasks.get(&id).ok_or_else(|| not_found(id))?.revision;
    if current != revision {
        return Err(conflict(current));
    }
    store.subtasks.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}
