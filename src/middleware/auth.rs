use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::handlers::AppState;

/// Authenticates the request with the configured provider and stores the
/// resulting `AuthenticatedUser` as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = state.auth.authenticate(request.headers()).await?;
    tracing::debug!(user_id = %user.id, "request authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
