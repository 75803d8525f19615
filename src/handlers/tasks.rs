// handlers/tasks.rs - task endpoints
//
// GET/POST /categories/:category_id/tasks
// GET/PATCH/DELETE /tasks/:task_id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Deserializer};

use super::{parse_id, required_text, AppState};
use crate::auth::AuthenticatedUser;
use crate::database::models::Task;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{NewTask, TaskChanges};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_checked: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    pub name: Option<String>,
    /// Absent keeps the description, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub is_checked: Option<bool>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// GET /categories/:category_id/tasks
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<String>,
) -> ApiResult<Vec<Task>> {
    let category_id = parse_id(&category_id)?;
    let tasks = state.tasks.list_by_category(category_id, user.id).await?;
    Ok(ApiResponse::success(tasks))
}

/// POST /categories/:category_id/tasks
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<String>,
    payload: Result<Json<CreateTaskBody>, JsonRejection>,
) -> ApiResult<Task> {
    let category_id = parse_id(&category_id)?;
    let Json(body) = payload?;
    let task = NewTask {
        name: required_text("name", body.name)?,
        description: body.description,
        is_checked: body.is_checked,
    };

    let created = state.tasks.create(category_id, user.id, task).await?;
    Ok(ApiResponse::created(created))
}

/// GET /tasks/:task_id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<String>,
) -> ApiResult<Task> {
    let task_id = parse_id(&task_id)?;
    state
        .tasks
        .find(task_id, user.id)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Not Found"))
}

/// PATCH /tasks/:task_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<String>,
    payload: Result<Json<UpdateTaskBody>, JsonRejection>,
) -> ApiResult<Task> {
    let task_id = parse_id(&task_id)?;
    let Json(body) = payload?;

    let changes = TaskChanges {
        name: body
            .name
            .map(|name| required_text("name", Some(name)))
            .transpose()?,
        description: body.description,
        is_checked: body.is_checked,
    };
    if changes.is_empty() {
        return Err(ApiError::validation_error(
            "At least one of name, description or isChecked is required",
            None,
        ));
    }

    state
        .tasks
        .update(task_id, user.id, changes)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Not Found"))
}

/// DELETE /tasks/:task_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<String>,
) -> ApiResult<()> {
    let task_id = parse_id(&task_id)?;
    if state.tasks.delete(task_id, user.id).await? {
        Ok(ApiResponse::no_content())
    } else {
        Err(ApiError::not_found("Not Found"))
    }
}
