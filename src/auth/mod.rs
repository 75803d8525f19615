//! Request authentication.
//!
//! A provider turns request headers into an [`AuthenticatedUser`] whose claims
//! are later handed to the scoped transaction runner.

pub mod claims;
pub mod client;
pub mod header;
pub mod jwks;
pub mod jwt;
pub mod provision;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AuthConfig, AuthMode, ConfigError, RlsConfig};
use crate::database::rls::PgTransactionSource;

pub use client::{AuthClient, AuthClientError, TokenPair};
pub use claims::{parse_access_token, Claims, ClaimsError, NumericDate};
pub use header::HeaderAuthentication;
pub use jwks::{JwksError, RemoteKeySet};
pub use jwt::JwtAuthentication;
pub use provision::{
    resolve_email, AccountProvisioner, ProvisionError, ProvisioningAuthentication,
    RlsAccountProvisioner,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub claims: Claims,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,
    #[error("Invalid authorization scheme")]
    InvalidScheme,
    #[error("Missing token value")]
    MissingToken,
    #[error("Token subject must be a UUID")]
    InvalidSubject,
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Token role does not satisfy the required role")]
    RoleMismatch,
    #[error(transparent)]
    KeySet(#[from] JwksError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError>;
}

/// Reads `<header_name>: <scheme> <token>` and returns the trimmed token.
pub fn extract_authorization_token<'h>(
    headers: &'h HeaderMap,
    header_name: &str,
    scheme: &str,
) -> Result<&'h str, AuthError> {
    let value = headers
        .get(header_name)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let token = value
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Builds the provider selected by configuration, wrapped with account
/// provisioning when enabled.
pub fn provider_from_config(
    auth: &AuthConfig,
    rls: &RlsConfig,
    pool: &PgPool,
) -> Result<Arc<dyn AuthenticationProvider>, ConfigError> {
    let base: Arc<dyn AuthenticationProvider> = match auth.mode {
        AuthMode::Header => Arc::new(HeaderAuthentication::new(
            auth.header_name.clone(),
            auth.scheme.clone(),
            rls.header_role.clone(),
        )),
        AuthMode::Jwt => Arc::new(JwtAuthentication::from_config(auth)?),
    };

    if !auth.provision_accounts {
        return Ok(base);
    }

    let provisioner = RlsAccountProvisioner::new(PgTransactionSource::new(pool.clone()));
    Ok(Arc::new(ProvisioningAuthentication::new(
        base,
        Arc::new(provisioner),
    )))
}
