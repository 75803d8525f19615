// handlers/mod.rs - application state and route table
//
// Public: /healthz, /healthz/database
// Authenticated: /users/:user_id/categories, /categories/*, /tasks/*

pub mod categories;
pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::AuthenticationProvider;
use crate::database::manager::DatabaseHealthCheck;
use crate::error::ApiError;
use crate::middleware::auth_middleware;
use crate::services::{CategoryService, TaskService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub categories: CategoryService,
    pub tasks: TaskService,
    pub auth: Arc<dyn AuthenticationProvider>,
    pub database_health: Option<Arc<dyn DatabaseHealthCheck>>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/users/:user_id/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/:category_id",
            get(categories::show)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/categories/:category_id/tasks",
            get(tasks::list).post(tasks::create),
        )
        .route(
            "/tasks/:task_id",
            get(tasks::show).patch(tasks::update).delete(tasks::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(health::liveness))
        .route("/healthz/database", get(health::database))
        .merge(protected)
        .with_state(state)
}

/// Ids are UUIDs; anything else cannot name an existing row.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Not Found"))
}

/// Trimmed, non-empty string field.
pub(crate) fn required_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::field_error(field, "must be a non-empty string"))
}
