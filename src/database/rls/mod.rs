//! Row-level-security scoped transactions.
//!
//! [`RlsClient::run`] opens a transaction, injects the principal's claims as
//! transaction-local settings, assumes the principal's database role, runs the
//! caller's work, and then explicitly tears the session state down again in
//! reverse order before committing. The transaction handle is passed to the
//! work closure; nothing about the principal lives in ambient state.

pub mod pg;
pub mod role;
pub mod session;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::auth::claims::Claims;
use crate::database::diagnostics::SqlError;

pub use pg::{PgScopedTransaction, PgTransactionSource};
pub use role::{DatabaseRole, DEFAULT_ROLE};
pub use session::{SessionContext, SessionStatement, SessionStep};

/// SQLSTATEs PostgreSQL uses when a role cannot be assumed.
const ROLE_PERMISSION_CODES: [&str; 3] = ["42501", "0A000", "28000"];

const ROLE_PERMISSION_MESSAGES: [&str; 3] = [
    "permission denied to set role",
    "must be member of role",
    "must be superuser",
];

/// A transaction the scoped runner can drive.
#[async_trait]
pub trait ScopedTransaction: Send {
    async fn execute(&mut self, statement: &SessionStatement) -> Result<(), SqlError>;

    async fn commit(self) -> Result<(), SqlError>
    where
        Self: Sized;

    async fn rollback(self) -> Result<(), SqlError>
    where
        Self: Sized;
}

/// Opens transactions for the scoped runner.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    type Transaction: ScopedTransaction;

    async fn begin(&self) -> Result<Self::Transaction, SqlError>;
}

#[derive(Debug, Error)]
pub enum RlsError {
    #[error("Failed to serialize claims: {0}")]
    Claims(#[from] serde_json::Error),

    #[error(
        "Failed to set local role \"{role}\". Grant the database user membership in that role so row-level security policies can run."
    )]
    RolePermissionDenied {
        role: String,
        #[source]
        source: SqlError,
    },

    /// Opening, configuring or committing the transaction failed.
    #[error(transparent)]
    Database(SqlError),

    /// The work succeeded but the session state could not be torn down.
    #[error(transparent)]
    Cleanup(SqlError),

    #[error("RLS transaction failed: {message}")]
    Transaction {
        message: String,
        #[source]
        source: SqlError,
    },
}

impl RlsError {
    fn transaction_failed(source: SqlError) -> Self {
        RlsError::Transaction {
            message: source.combined_report(),
            source,
        }
    }
}

fn is_role_permission_error(err: &SqlError) -> bool {
    let message = err.message().to_lowercase();
    if ROLE_PERMISSION_MESSAGES.iter().any(|m| message.contains(m)) {
        return true;
    }
    err.code()
        .map(|code| ROLE_PERMISSION_CODES.contains(&code))
        .unwrap_or(false)
}

/// Runs work as one principal. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct RlsClient<S> {
    source: S,
    context: SessionContext,
}

impl<S: TransactionSource> RlsClient<S> {
    pub fn new(source: S, claims: &Claims) -> Result<Self, RlsError> {
        let context = SessionContext {
            serialized_claims: serde_json::to_string(claims)?,
            subject: claims.sub.clone(),
            role: DatabaseRole::sanitize(claims.role.as_deref()),
        };
        Ok(Self { source, context })
    }

    pub fn role(&self) -> &DatabaseRole {
        &self.context.role
    }

    pub fn subject(&self) -> &str {
        &self.context.subject
    }

    /// Runs `work` inside a transaction scoped to this client's principal.
    ///
    /// On success the session state is reverted and the transaction committed;
    /// a teardown failure replaces the result. On failure teardown is
    /// best-effort, the transaction is rolled back and the work error is
    /// returned with its diagnostic chain folded into the message.
    pub async fn run<T, F>(&self, work: F) -> Result<T, RlsError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut S::Transaction) -> BoxFuture<'t, Result<T, SqlError>> + Send,
    {
        let mut tx = self.source.begin().await.map_err(RlsError::Database)?;
        let mut applied: Vec<SessionStep> = Vec::with_capacity(SessionStep::SETUP_ORDER.len());

        if let Err(err) = self.apply_session(&mut tx, &mut applied).await {
            revert_session(&mut tx, &applied, false).await.ok();
            rollback_quietly(tx).await;
            return Err(err);
        }

        tracing::debug!(
            subject = %self.context.subject,
            role = %self.context.role,
            "rls session applied"
        );

        match work(&mut tx).await {
            Ok(value) => {
                if let Err(err) = revert_session(&mut tx, &applied, true).await {
                    rollback_quietly(tx).await;
                    return Err(RlsError::Cleanup(err));
                }
                tx.commit().await.map_err(RlsError::Database)?;
                Ok(value)
            }
            Err(err) => {
                revert_session(&mut tx, &applied, false).await.ok();
                rollback_quietly(tx).await;
                Err(RlsError::transaction_failed(err))
            }
        }
    }

    async fn apply_session(
        &self,
        tx: &mut S::Transaction,
        applied: &mut Vec<SessionStep>,
    ) -> Result<(), RlsError> {
        for step in SessionStep::SETUP_ORDER {
            let statement = self.context.apply(step);
            match tx.execute(&statement).await {
                Ok(()) => applied.push(step),
                Err(err) if step == SessionStep::ActiveRole && is_role_permission_error(&err) => {
                    tracing::warn!(role = %self.context.role, "database user cannot assume role");
                    return Err(RlsError::RolePermissionDenied {
                        role: self.context.role.to_string(),
                        source: err,
                    });
                }
                Err(err) => return Err(RlsError::Database(err)),
            }
        }
        Ok(())
    }
}

/// Reverts applied steps last-first. Every step is attempted; with
/// `propagate` the first failure is returned, otherwise failures are logged.
async fn revert_session<X: ScopedTransaction>(
    tx: &mut X,
    applied: &[SessionStep],
    propagate: bool,
) -> Result<(), SqlError> {
    let mut first_error: Option<SqlError> = None;

    for step in applied.iter().rev() {
        if let Err(err) = tx.execute(&SessionContext::revert(*step)).await {
            if propagate {
                first_error.get_or_insert(err);
            } else {
                tracing::warn!(step = ?step, error = %err, "ignoring rls cleanup failure");
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn rollback_quietly<X: ScopedTransaction>(tx: X) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "rollback after rls failure did not complete");
    }
}
