pub mod category;
pub mod task;

pub use category::{
    CategoryRepository, CreateCategoryParams, ListCategoriesParams, PgCategoryRepository,
    UpdateCategoryParams,
};
pub use task::{CreateTaskParams, PgTaskRepository, TaskRepository, UpdateTaskParams};
