pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ConfigError, SecurityConfig};
use crate::database::repositories::{PgCategoryRepository, PgTaskRepository};
use crate::database::DatabaseManager;
use crate::handlers::AppState;
use crate::services::{CategoryService, TaskService};

/// Wires the PostgreSQL-backed repositories, services and the configured
/// authentication provider into the router state.
pub fn build_state(config: &AppConfig, database: &DatabaseManager) -> Result<AppState, ConfigError> {
    let pool = database.pool();
    let categories: Arc<PgCategoryRepository> = Arc::new(PgCategoryRepository::new(pool.clone()));
    let tasks = Arc::new(PgTaskRepository::new(pool.clone()));

    Ok(AppState {
        categories: CategoryService::new(categories.clone(), config.pagination.default_limit),
        tasks: TaskService::new(tasks, categories),
        auth: auth::provider_from_config(&config.auth, &config.rls, pool)?,
        database_health: Some(Arc::new(database.clone())),
    })
}

/// Full application: routes plus the global middleware stack.
pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    let router = handlers::router(state).layer(TraceLayer::new_for_http());
    match cors_layer(security) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
