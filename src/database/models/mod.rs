pub mod category;
pub mod task;

pub use category::{Category, DEFAULT_CATEGORY_KIND, DEFAULT_CATEGORY_NAME};
pub use task::Task;
