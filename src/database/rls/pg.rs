use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{ScopedTransaction, SessionStatement, TransactionSource};
use crate::database::diagnostics::SqlError;

/// Opens scoped transactions on a shared pool.
#[derive(Debug, Clone)]
pub struct PgTransactionSource {
    pool: PgPool,
}

impl PgTransactionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionSource for PgTransactionSource {
    type Transaction = PgScopedTransaction;

    async fn begin(&self) -> Result<Self::Transaction, SqlError> {
        let tx = self.pool.begin().await?;
        Ok(PgScopedTransaction(tx))
    }
}

/// A live PostgreSQL transaction handed to scoped work.
pub struct PgScopedTransaction(Transaction<'static, Postgres>);

impl PgScopedTransaction {
    /// Connection to run the caller's own queries on.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.0
    }
}

#[async_trait]
impl ScopedTransaction for PgScopedTransaction {
    async fn execute(&mut self, statement: &SessionStatement) -> Result<(), SqlError> {
        let sql = statement.sql();
        match statement {
            SessionStatement::SetConfig { key, value } => {
                sqlx::query(&sql)
                    .bind(*key)
                    .bind(value.as_deref())
                    .execute(&mut *self.0)
                    .await?;
            }
            SessionStatement::SetLocalRole(_) | SessionStatement::ResetRole => {
                sqlx::query(&sql).execute(&mut *self.0).await?;
            }
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), SqlError> {
        self.0.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), SqlError> {
        self.0.rollback().await?;
        Ok(())
    }
}
