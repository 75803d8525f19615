// handlers/categories.rs - category endpoints
//
// GET/POST /users/:user_id/categories
// GET/PATCH/DELETE /categories/:category_id

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{parse_id, required_text, AppState};
use crate::auth::AuthenticatedUser;
use crate::database::models::Category;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    pub name: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
}

/// Only `^[1-9][0-9]*$` is a page size; anything else is rejected, not clamped.
fn parse_limit(raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let well_formed = raw.starts_with(|c: char| ('1'..='9').contains(&c))
        && raw.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(ApiError::bad_request("Invalid limit parameter"));
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ApiError::bad_request("Invalid limit parameter"))
}

/// The path user must be the caller.
fn ensure_caller(user: &AuthenticatedUser, path_user_id: &str) -> Result<Uuid, ApiError> {
    match Uuid::parse_str(path_user_id) {
        Ok(id) if id == user.id => Ok(id),
        _ => Err(ApiError::forbidden("Forbidden")),
    }
}

/// GET /users/:user_id/categories
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Category>> {
    let user_id = ensure_caller(&user, &user_id)?;
    let limit = parse_limit(query.limit.as_deref())?;

    let page = state
        .categories
        .list_by_user(user_id, limit, query.cursor)
        .await?;

    Ok(ApiResponse::success(page.items).with_meta(json!({
        "nextCursor": page.next_cursor,
        "hasMore": page.has_more,
    })))
}

/// POST /users/:user_id/categories
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    payload: Result<Json<CreateCategoryBody>, JsonRejection>,
) -> ApiResult<Category> {
    let user_id = ensure_caller(&user, &user_id)?;
    let Json(body) = payload?;
    let name = required_text("name", body.name)?;
    let kind = required_text("kind", body.kind)?;

    let category = state.categories.create(user_id, name, kind).await?;
    Ok(ApiResponse::created(category))
}

/// GET /categories/:category_id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<String>,
) -> ApiResult<Category> {
    let category_id = parse_id(&category_id)?;
    state
        .categories
        .find(category_id, user.id)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Not Found"))
}

/// PATCH /categories/:category_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<String>,
    payload: Result<Json<UpdateCategoryBody>, JsonRejection>,
) -> ApiResult<Category> {
    let category_id = parse_id(&category_id)?;
    let Json(body) = payload?;
    let name = required_text("name", body.name)?;

    state
        .categories
        .rename(category_id, user.id, name)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Not Found"))
}

/// DELETE /categories/:category_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<String>,
) -> ApiResult<()> {
    let category_id = parse_id(&category_id)?;
    if state.categories.delete(category_id, user.id).await? {
        Ok(ApiResponse::no_content())
    } else {
        Err(ApiError::not_found("Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_accepts_only_positive_decimal_integers() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("1")).unwrap(), Some(1));
        assert_eq!(parse_limit(Some("250")).unwrap(), Some(250));
        for bad in ["", "0", "01", "-1", "+5", "2.5", "1e3", " 5", "ten", "99999999999"] {
            assert!(parse_limit(Some(bad)).is_err(), "{:?}", bad);
        }
    }
}
