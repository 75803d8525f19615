//! In-memory stand-ins for the database-backed seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::auth::{
    resolve_email, AccountProvisioner, AuthError, AuthenticatedUser, AuthenticationProvider,
    Claims, ProvisionError,
};
use crate::database::cursor::CursorKey;
use crate::database::diagnostics::SqlError;
use crate::database::manager::{DatabaseError, DatabaseHealthCheck};
use crate::database::models::{Category, Task};
use crate::database::pagination::{paginate, Keyset, PageLimit, PaginatedResult};
use crate::database::repositories::{
    CategoryRepository, CreateCategoryParams, CreateTaskParams, ListCategoriesParams,
    TaskRepository, UpdateCategoryParams, UpdateTaskParams,
};
use crate::database::rls::session::CLAIMS_SETTING;
use crate::database::rls::{RlsError, ScopedTransaction, SessionStatement, TransactionSource};

static CLOCK: AtomicI64 = AtomicI64::new(0);

/// Strictly increasing timestamps so insertion order is also recency order.
fn tick() -> DateTime<Utc> {
    let n = CLOCK.fetch_add(1, Ordering::SeqCst);
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::microseconds(n)
}

pub fn claims_for(sub: &str, role: Option<&str>) -> Claims {
    Claims::for_subject(sub, role.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Scoped transactions

#[derive(Default)]
struct Recording {
    log: Vec<String>,
    claims_blob: Option<String>,
    failures: HashMap<String, SqlError>,
}

/// Transaction source that records every statement as a log line and can be
/// told to fail on any of them.
#[derive(Clone, Default)]
pub struct RecordingSource {
    state: Arc<Mutex<Recording>>,
}

impl RecordingSource {
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// Last non-null value written to the claims setting.
    pub fn claims_blob(&self) -> Option<String> {
        self.state.lock().unwrap().claims_blob.clone()
    }

    /// Fail when the log line `line` is produced.
    pub fn fail_on(&self, line: &str, err: SqlError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(line.to_string(), err);
    }

    fn record(state: &Mutex<Recording>, line: String) -> Result<(), SqlError> {
        let mut state = state.lock().unwrap();
        let failure = state.failures.get(&line).cloned();
        state.log.push(line);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct RecordingTx {
    state: Arc<Mutex<Recording>>,
}

#[async_trait]
impl TransactionSource for RecordingSource {
    type Transaction = RecordingTx;

    async fn begin(&self) -> Result<RecordingTx, SqlError> {
        RecordingSource::record(&self.state, "begin".to_string())?;
        Ok(RecordingTx {
            state: self.state.clone(),
        })
    }
}

#[async_trait]
impl ScopedTransaction for RecordingTx {
    async fn execute(&mut self, statement: &SessionStatement) -> Result<(), SqlError> {
        let line = match statement {
            SessionStatement::SetConfig { key, value: None } => format!("set_config {}=NULL", key),
            SessionStatement::SetConfig { key, value: Some(value) } if *key == CLAIMS_SETTING => {
                self.state.lock().unwrap().claims_blob = Some(value.clone());
                format!("set_config {}=<claims>", key)
            }
            SessionStatement::SetConfig { key, value: Some(value) } => {
                format!("set_config {}={}", key, value)
            }
            other => other.sql(),
        };
        RecordingSource::record(&self.state, line)
    }

    async fn commit(self) -> Result<(), SqlError> {
        RecordingSource::record(&self.state, "commit".to_string())
    }

    async fn rollback(self) -> Result<(), SqlError> {
        RecordingSource::record(&self.state, "rollback".to_string())
    }
}

// ---------------------------------------------------------------------------
// Repositories

#[derive(Default)]
pub struct InMemoryCategories {
    rows: Mutex<Vec<Category>>,
}

impl InMemoryCategories {
    pub fn seed(&self, owner: Uuid, name: &str) -> Category {
        let now = tick();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: "user".to_string(),
            created_by: owner,
            updated_by: owner,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(category.clone());
        category
    }

    fn owner_of(&self, category_id: Uuid) -> Option<Uuid> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.created_by)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategories {
    async fn list_by_user_id(
        &self,
        params: ListCategoriesParams,
    ) -> Result<PaginatedResult<Category>, DatabaseError> {
        let mut owned: Vec<Category> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.created_by == params.user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| CursorKey::descending(&a.cursor_key(), &b.cursor_key()));

        paginate(
            PageLimit::new(params.limit),
            params.cursor.as_deref(),
            |after, take| async move {
                // Ids compare as UUIDs and a cursor id that is not one is ignored,
                // as in the PostgreSQL repository.
                let bound = after.and_then(|key| {
                    Uuid::parse_str(&key.id)
                        .ok()
                        .map(|id| (key.created_at, id))
                });
                Ok::<_, DatabaseError>(
                    owned
                        .into_iter()
                        .filter(|c| {
                            bound.map_or(true, |(created_at, id)| {
                                c.created_at < created_at
                                    || (c.created_at == created_at && c.id < id)
                            })
                        })
                        .take(take as usize)
                        .collect(),
                )
            },
        )
        .await
    }

    async fn find_by_id(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Category>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == category_id && user_id.map_or(true, |u| c.created_by == u))
            .cloned())
    }

    async fn create(&self, params: CreateCategoryParams) -> Result<Category, DatabaseError> {
        let now = tick();
        let category = Category {
            id: Uuid::new_v4(),
            name: params.name,
            kind: params.kind,
            created_by: params.created_by,
            updated_by: params.updated_by,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn update(&self, params: UpdateCategoryParams) -> Result<Option<Category>, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(category) = rows
            .iter_mut()
            .find(|c| c.id == params.category_id && c.created_by == params.user_id)
        else {
            return Ok(None);
        };
        category.name = params.name;
        category.updated_by = params.updated_by;
        category.updated_at = tick();
        Ok(Some(category.clone()))
    }

    async fn delete(&self, category_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| !(c.id == category_id && c.created_by == user_id));
        Ok(rows.len() < before)
    }
}

/// Tasks visible to whoever created them and to the owner of their category.
pub struct InMemoryTasks {
    categories: Arc<InMemoryCategories>,
    rows: Mutex<Vec<Task>>,
}

impl InMemoryTasks {
    pub fn new(categories: Arc<InMemoryCategories>) -> Self {
        Self {
            categories,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, category_id: Uuid, created_by: Uuid, name: &str) -> Task {
        let now = tick();
        let task = Task {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_checked: false,
            category_id,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(task.clone());
        task
    }

    fn visible(&self, task: &Task, user_id: Option<Uuid>) -> bool {
        match user_id {
            None => true,
            Some(user) => {
                task.created_by == user || self.categories.owner_of(task.category_id) == Some(user)
            }
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn list_by_category(
        &self,
        category_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Task>, DatabaseError> {
        let rows = self.rows.lock().unwrap().clone();
        let mut tasks: Vec<Task> = rows
            .into_iter()
            .filter(|t| t.category_id == category_id && self.visible(t, user_id))
            .collect();
        tasks.sort_by(|a, b| CursorKey::descending(&a.cursor_key(), &b.cursor_key()));
        Ok(tasks)
    }

    async fn find_by_id(
        &self,
        task_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Task>, DatabaseError> {
        let task = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .cloned();
        Ok(task.filter(|t| self.visible(t, user_id)))
    }

    async fn create(&self, params: CreateTaskParams) -> Result<Task, DatabaseError> {
        let now = tick();
        let task = Task {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            is_checked: params.is_checked,
            category_id: params.category_id,
            created_by: params.created_by,
            updated_by: params.updated_by,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update(&self, params: UpdateTaskParams) -> Result<Option<Task>, DatabaseError> {
        let Some(existing) = self.find_by_id(params.task_id, Some(params.user_id)).await? else {
            return Ok(None);
        };
        let mut rows = self.rows.lock().unwrap();
        let Some(task) = rows.iter_mut().find(|t| t.id == existing.id) else {
            return Ok(None);
        };
        if let Some(name) = params.name {
            task.name = name;
        }
        if let Some(description) = params.description {
            task.description = description;
        }
        if let Some(is_checked) = params.is_checked {
            task.is_checked = is_checked;
        }
        task.updated_by = params.updated_by;
        task.updated_at = tick();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, task_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        if self.find_by_id(task_id, Some(user_id)).await?.is_none() {
            return Ok(false);
        }
        self.rows.lock().unwrap().retain(|t| t.id != task_id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Health and authentication

pub struct StubHealth {
    pub healthy: bool,
}

#[async_trait]
impl DatabaseHealthCheck for StubHealth {
    async fn check(&self) -> Result<(), DatabaseError> {
        if self.healthy {
            Ok(())
        } else {
            Err(DatabaseError::QueryError("connection refused".to_string()))
        }
    }
}

/// Returns a fixed user, or rejects every request.
pub struct StaticAuthentication {
    user: Option<AuthenticatedUser>,
}

impl StaticAuthentication {
    pub fn user(user: AuthenticatedUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn rejecting() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthenticationProvider for StaticAuthentication {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        self.user.clone().ok_or(AuthError::MissingHeader)
    }
}

#[derive(Default)]
pub struct RecordingProvisioner {
    fail: bool,
    provisioned: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingProvisioner {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// `(user id, resolved email)` per provisioning call.
    pub fn provisioned(&self) -> Vec<(Uuid, String)> {
        self.provisioned.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountProvisioner for RecordingProvisioner {
    async fn provision(&self, user: &AuthenticatedUser) -> Result<(), ProvisionError> {
        if self.fail {
            return Err(ProvisionError::Rls(RlsError::Database(SqlError::new(
                "permission denied for table profiles",
            ))));
        }
        self.provisioned
            .lock()
            .unwrap()
            .push((user.id, resolve_email(user.claims.email(), user.id)));
        Ok(())
    }
}
