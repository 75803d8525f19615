use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Task;

const TASK_COLUMNS: &str = "t.id, t.name, t.description, t.is_checked, t.category_id, \
                            t.created_by, t.updated_by, t.created_at, t.updated_at";

const RETURNING_COLUMNS: &str = "id, name, description, is_checked, category_id, \
                                 created_by, updated_by, created_at, updated_at";

/// A task is visible to whoever created it and to the owner of its category.
const VISIBLE_TO_USER: &str = "(tasks.created_by = $2 OR EXISTS (\
                               SELECT 1 FROM categories c \
                               WHERE c.id = tasks.category_id AND c.created_by = $2))";

#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_checked: bool,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

/// Fields left as `None` keep their stored value. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskParams {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_checked: Option<bool>,
    pub updated_by: Uuid,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks of a category, newest first. With a user, only tasks visible to them.
    async fn list_by_category(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Task>, DatabaseError>;

    async fn find_by_id(
        &self,
        task_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Task>, DatabaseError>;

    async fn create(&self, params: CreateTaskParams) -> Result<Task, DatabaseError>;

    async fn update(&self, params: UpdateTaskParams) -> Result<Option<Task>, DatabaseError>;

    async fn delete(&self, task_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;
}

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list_by_category(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Task>, DatabaseError> {
        let tasks = match user_id {
            None => {
                let query = format!(
                    "SELECT {} FROM tasks t WHERE t.category_id = $1 \
                     ORDER BY t.created_at DESC, t.id DESC",
                    TASK_COLUMNS
                );
                sqlx::query_as::<_, Task>(&query)
                    .bind(category_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(user_id) => {
                let query = format!(
                    "SELECT {} FROM tasks t \
                     INNER JOIN categories c ON c.id = t.category_id \
                     WHERE t.category_id = $1 AND (t.created_by = $2 OR c.created_by = $2) \
                     ORDER BY t.created_at DESC, t.id DESC",
                    TASK_COLUMNS
                );
                sqlx::query_as::<_, Task>(&query)
                    .bind(category_id)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(tasks)
    }

    async fn find_by_id(
        &self,
        task_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Task>, DatabaseError> {
        let task = match user_id {
            None => {
                let query = format!("SELECT {} FROM tasks t WHERE t.id = $1 LIMIT 1", TASK_COLUMNS);
                sqlx::query_as::<_, Task>(&query)
                    .bind(task_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            Some(user_id) => {
                let query = format!(
                    "SELECT {} FROM tasks t \
                     INNER JOIN categories c ON c.id = t.category_id \
                     WHERE t.id = $1 AND (t.created_by = $2 OR c.created_by = $2) \
                     LIMIT 1",
                    TASK_COLUMNS
                );
                sqlx::query_as::<_, Task>(&query)
                    .bind(task_id)
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(task)
    }

    async fn create(&self, params: CreateTaskParams) -> Result<Task, DatabaseError> {
        let query = format!(
            "INSERT INTO tasks (name, description, is_checked, category_id, created_by, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            RETURNING_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(&params.name)
            .bind(&params.description)
            .bind(params.is_checked)
            .bind(params.category_id)
            .bind(params.created_by)
            .bind(params.updated_by)
            .fetch_optional(&self.pool)
            .await?;

        task.ok_or_else(|| DatabaseError::QueryError("Failed to create task".to_string()))
    }

    async fn update(&self, params: UpdateTaskParams) -> Result<Option<Task>, DatabaseError> {
        let query = format!(
            "UPDATE tasks SET \
             updated_by = $3, updated_at = now(), \
             name = COALESCE($4, name), \
             description = CASE WHEN $5 THEN $6 ELSE description END, \
             is_checked = COALESCE($7, is_checked) \
             WHERE id = $1 AND {} RETURNING {}",
            VISIBLE_TO_USER, RETURNING_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(params.task_id)
            .bind(params.user_id)
            .bind(params.updated_by)
            .bind(&params.name)
            .bind(params.description.is_some())
            .bind(params.description.clone().flatten())
            .bind(params.is_checked)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn delete(&self, task_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let query = format!("DELETE FROM tasks WHERE id = $1 AND {}", VISIBLE_TO_USER);
        let result = sqlx::query(&query)
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
