use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Category;
use crate::database::pagination::{paginate, PageLimit, PaginatedResult};

const CATEGORY_COLUMNS: &str = "id, name, kind, created_by, updated_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ListCategoriesParams {
    pub user_id: Uuid,
    pub limit: i64,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub kind: String,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub updated_by: Uuid,
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Keyset page of the user's categories, newest first.
    async fn list_by_user_id(
        &self,
        params: ListCategoriesParams,
    ) -> Result<PaginatedResult<Category>, DatabaseError>;

    /// `None` when the category does not exist or belongs to someone other than `user_id`.
    async fn find_by_id(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Category>, DatabaseError>;

    async fn create(&self, params: CreateCategoryParams) -> Result<Category, DatabaseError>;

    async fn update(&self, params: UpdateCategoryParams) -> Result<Option<Category>, DatabaseError>;

    async fn delete(&self, category_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list_by_user_id(
        &self,
        params: ListCategoriesParams,
    ) -> Result<PaginatedResult<Category>, DatabaseError> {
        let pool = &self.pool;
        let user_id = params.user_id;

        paginate(
            PageLimit::new(params.limit),
            params.cursor.as_deref(),
            |after, take| async move {
                // Ids are UUIDs; a cursor carrying anything else is ignored.
                let bound = after.and_then(|key| {
                    Uuid::parse_str(&key.id)
                        .ok()
                        .map(|id| (key.created_at, id))
                });

                let rows = match bound {
                    Some((created_at, id)) => {
                        let query = format!(
                            "SELECT {} FROM categories \
                             WHERE created_by = $1 \
                             AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                             ORDER BY created_at DESC, id DESC \
                             LIMIT $4",
                            CATEGORY_COLUMNS
                        );
                        sqlx::query_as::<_, Category>(&query)
                            .bind(user_id)
                            .bind(created_at)
                            .bind(id)
                            .bind(take)
                            .fetch_all(pool)
                            .await?
                    }
                    None => {
                        let query = format!(
                            "SELECT {} FROM categories \
                             WHERE created_by = $1 \
                             ORDER BY created_at DESC, id DESC \
                             LIMIT $2",
                            CATEGORY_COLUMNS
                        );
                        sqlx::query_as::<_, Category>(&query)
                            .bind(user_id)
                            .bind(take)
                            .fetch_all(pool)
                            .await?
                    }
                };

                Ok::<_, DatabaseError>(rows)
            },
        )
        .await
    }

    async fn find_by_id(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Category>, DatabaseError> {
        let query = format!("SELECT {} FROM categories WHERE id = $1 LIMIT 1", CATEGORY_COLUMNS);
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category.filter(|c| user_id.map_or(true, |uid| c.created_by == uid)))
    }

    async fn create(&self, params: CreateCategoryParams) -> Result<Category, DatabaseError> {
        let query = format!(
            "INSERT INTO categories (name, kind, created_by, updated_by) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(&params.name)
            .bind(&params.kind)
            .bind(params.created_by)
            .bind(params.updated_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(category)
    }

    async fn update(&self, params: UpdateCategoryParams) -> Result<Option<Category>, DatabaseError> {
        let query = format!(
            "UPDATE categories SET name = $3, updated_by = $4, updated_at = now() \
             WHERE id = $1 AND created_by = $2 RETURNING {}",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(params.category_id)
            .bind(params.user_id)
            .bind(&params.name)
            .bind(params.updated_by)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn delete(&self, category_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND created_by = $2")
            .bind(category_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
