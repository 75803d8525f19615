pub mod category_service;
pub mod task_service;

use thiserror::Error;

use crate::database::manager::DatabaseError;

pub use category_service::CategoryService;
pub use task_service::{NewTask, TaskChanges, TaskService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Category not found")]
    CategoryNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
