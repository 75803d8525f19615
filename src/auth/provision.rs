//! First-request account provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use futures::FutureExt;
use thiserror::Error;
use uuid::Uuid;

use super::{AuthError, AuthenticatedUser, AuthenticationProvider};
use crate::database::diagnostics::SqlError;
use crate::database::models::{DEFAULT_CATEGORY_KIND, DEFAULT_CATEGORY_NAME};
use crate::database::rls::{PgTransactionSource, RlsClient, RlsError};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to provision account: {0}")]
    Rls(#[from] RlsError),
}

/// Creates whatever an account needs before its first real request.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    async fn provision(&self, user: &AuthenticatedUser) -> Result<(), ProvisionError>;
}

/// The token's email when present, otherwise a stable per-user placeholder.
pub fn resolve_email(email: Option<&str>, user_id: Uuid) -> String {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => email.to_string(),
        None => format!("{}@placeholder.invalid", user_id),
    }
}

/// Inserts the profile row and the default category as the user themselves,
/// so the inserts pass through row-level security.
pub struct RlsAccountProvisioner {
    source: PgTransactionSource,
}

impl RlsAccountProvisioner {
    pub fn new(source: PgTransactionSource) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AccountProvisioner for RlsAccountProvisioner {
    async fn provision(&self, user: &AuthenticatedUser) -> Result<(), ProvisionError> {
        let client = RlsClient::new(self.source.clone(), &user.claims)?;
        let user_id = user.id;
        let email = resolve_email(user.claims.email(), user_id);
        // The conflict target must match the partial unique index literally.
        let insert_default_category = format!(
            "INSERT INTO categories (name, kind, created_by, updated_by) \
             VALUES ($1, '{kind}', $2, $2) \
             ON CONFLICT (created_by, name) WHERE kind = '{kind}' DO NOTHING",
            kind = DEFAULT_CATEGORY_KIND
        );

        client
            .run(move |tx| {
                async move {
                    sqlx::query(
                        "INSERT INTO profiles (id, email) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                    )
                    .bind(user_id)
                    .bind(&email)
                    .execute(tx.conn())
                    .await?;

                    sqlx::query(&insert_default_category)
                        .bind(DEFAULT_CATEGORY_NAME)
                        .bind(user_id)
                        .execute(tx.conn())
                        .await?;

                    Ok::<_, SqlError>(())
                }
                .boxed()
            })
            .await?;

        tracing::debug!(user_id = %user_id, "account provisioned");
        Ok(())
    }
}

/// Runs the inner provider, then provisions the authenticated account.
pub struct ProvisioningAuthentication {
    inner: Arc<dyn AuthenticationProvider>,
    provisioner: Arc<dyn AccountProvisioner>,
}

impl ProvisioningAuthentication {
    pub fn new(
        inner: Arc<dyn AuthenticationProvider>,
        provisioner: Arc<dyn AccountProvisioner>,
    ) -> Self {
        Self { inner, provisioner }
    }
}

#[async_trait]
impl AuthenticationProvider for ProvisioningAuthentication {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let user = self.inner.authenticate(headers).await?;
        self.provisioner.provision(&user).await?;
        Ok(user)
    }
}
