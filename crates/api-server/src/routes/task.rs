//! Task API endpoints
//!
//! RESTful API for task CRUD operations.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use notesphere_core::category::CategoryId;
use notesphere_core::envelope::ApiResponse;
use notesphere_core::patch::Patch;
use notesphere_core::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate};
use notesphere_core::Error;

use super::{error_response, json_body, ok, path_param, query_params, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

/// Status as sent by clients: the tagged name, or a legacy numeric code
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum StatusParam {
    Code(u8),
    Name(TaskStatus),
}

impl TryFrom<StatusParam> for TaskStatus {
    type Error = Error;

    fn try_from(param: StatusParam) -> Result<Self, Error> {
        match param {
            StatusParam::Name(status) => Ok(status),
            StatusParam::Code(0) => Ok(TaskStatus::Todo),
            StatusParam::Code(1) => Ok(TaskStatus::InProgress),
            StatusParam::Code(2) => Ok(TaskStatus::Done),
            StatusParam::Code(other) => Err(Error::validation(
                "status",
                format!("unknown status code {}", other),
            )),
        }
    }
}

/// Parse a `?status=` query value
fn parse_status(raw: &str) -> Result<TaskStatus, Error> {
    match raw.parse::<u8>() {
        Ok(code) => StatusParam::Code(code).try_into(),
        Err(_) => raw.parse(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<StatusParam>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl CreateTaskRequest {
    fn into_new_task(self) -> Result<NewTask, Error> {
        Ok(NewTask {
            title: self.title,
            description: self.description,
            status: self.status.map(TaskStatus::try_from).transpose()?,
            priority: self.priority,
            due_date: self.due_date,
            category_ids: self.category_ids,
        })
    }
}

/// Partial update; omitted fields are left untouched, `null` clears
/// `description` and `due_date`.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Option<StatusParam>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Patch<DateTime<Utc>>,
    #[serde(default)]
    pub category_ids: Option<Vec<CategoryId>>,
}

impl UpdateTaskRequest {
    fn into_update(self) -> Result<TaskUpdate, Error> {
        Ok(TaskUpdate {
            title: self.title,
            description: self.description,
            status: self.status.map(TaskStatus::try_from).transpose()?,
            priority: self.priority,
            due_date: self.due_date,
            category_ids: self.category_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List tasks, newest first, optionally by status
async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult<Vec<Task>> {
    let query = query_params(query)?;
    let tasks = match query.status.as_deref() {
        Some(raw) => {
            let status = parse_status(raw).map_err(|e| error_response(e, "Invalid status"))?;
            state.task_store().find_by_status(status).await
        }
        None => state.task_store().list().await,
    }
    .map_err(|e| error_response(e, "Failed to fetch tasks"))?;

    ok(tasks)
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let input = json_body(payload)?
        .into_new_task()
        .map_err(|e| error_response(e, "Failed to create task"))?;

    let created = state
        .task_store()
        .create(input)
        .await
        .map_err(|e| error_response(e, "Failed to create task"))?;

    ok(created)
}

/// GET /api/tasks/{id} - Get a single task
async fn get_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Task> {
    let id = path_param(id)?;
    let task = state
        .task_store()
        .get(id)
        .await
        .map_err(|e| error_response(e, "Failed to fetch task"))?;

    ok(task)
}

/// PUT /api/tasks/{id} - Partially update a task
async fn update_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let id = path_param(id)?;
    let update = json_body(payload)?
        .into_update()
        .map_err(|e| error_response(e, "Failed to update task"))?;

    let updated = state
        .task_store()
        .update(id, update)
        .await
        .map_err(|e| error_response(e, "Failed to update task"))?;

    ok(updated)
}

/// DELETE /api/tasks/{id} - Delete a task and its category links
async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<()> {
    let id = path_param(id)?;
    state
        .task_store()
        .delete(id)
        .await
        .map_err(|e| error_response(e, "Failed to delete task"))?;

    Ok(Json(ApiResponse::empty()))
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
}
