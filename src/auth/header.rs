use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::{extract_authorization_token, AuthError, AuthenticatedUser, AuthenticationProvider};
use crate::auth::claims::Claims;

/// Trusts the header value as the caller's user id.
///
/// Meant for deployments behind a gateway that has already authenticated the
/// caller. The principal is given `role` as its role claim.
pub struct HeaderAuthentication {
    header_name: String,
    scheme: String,
    role: String,
}

impl HeaderAuthentication {
    pub fn new(header_name: String, scheme: String, role: String) -> Self {
        Self {
            header_name,
            scheme,
            role,
        }
    }
}

#[async_trait]
impl AuthenticationProvider for HeaderAuthentication {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let value = extract_authorization_token(headers, &self.header_name, &self.scheme)?;
        let id = Uuid::parse_str(value).map_err(|_| AuthError::InvalidSubject)?;

        Ok(AuthenticatedUser {
            id,
            claims: Claims::for_subject(id.to_string(), Some(self.role.clone())),
        })
    }
}
