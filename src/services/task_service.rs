use std::sync::Arc;

use uuid::Uuid;

use super::ServiceError;
use crate::database::models::Task;
use crate::database::repositories::{
    CategoryRepository, CreateTaskParams, TaskRepository, UpdateTaskParams,
};

#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub is_checked: Option<bool>,
}

/// Partial task update; `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_checked: Option<bool>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_checked.is_none()
    }
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { tasks, categories }
    }

    pub async fn list_by_category(
        &self,
        category_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Task>, ServiceError> {
        Ok(self.tasks.list_by_category(category_id, Some(user_id)).await?)
    }

    pub async fn find(&self, task_id: Uuid, user_id: Uuid) -> Result<Option<Task>, ServiceError> {
        Ok(self.tasks.find_by_id(task_id, Some(user_id)).await?)
    }

    /// Fails with `CategoryNotFound` unless the category is visible to the user.
    pub async fn create(
        &self,
        category_id: Uuid,
        user_id: Uuid,
        task: NewTask,
    ) -> Result<Task, ServiceError> {
        if self
            .categories
            .find_by_id(category_id, Some(user_id))
            .await?
            .is_none()
        {
            return Err(ServiceError::CategoryNotFound);
        }

        let created = self
            .tasks
            .create(CreateTaskParams {
                category_id,
                name: task.name,
                description: task.description,
                is_checked: task.is_checked.unwrap_or(false),
                created_by: user_id,
                updated_by: user_id,
            })
            .await?;
        Ok(created)
    }

    pub async fn update(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, ServiceError> {
        Ok(self
            .tasks
            .update(UpdateTaskParams {
                task_id,
                user_id,
                name: changes.name,
                description: changes.description,
                is_checked: changes.is_checked,
                updated_by: user_id,
            })
            .await?)
    }

    pub async fn delete(&self, task_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.tasks.delete(task_id, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryCategories, InMemoryTasks};

    fn service() -> (TaskService, Arc<InMemoryCategories>, Arc<InMemoryTasks>) {
        let categories = Arc::new(InMemoryCategories::default());
        let tasks = Arc::new(InMemoryTasks::new(categories.clone()));
        (
            TaskService::new(tasks.clone(), categories.clone()),
            categories,
            tasks,
        )
    }

    fn new_task(name: &str) -> NewTask {
        NewTask {
            name: name.into(),
            description: None,
            is_checked: None,
        }
    }

    #[tokio::test]
    async fn create_requires_a_visible_category() {
        let (service, categories, _) = service();
        let owner = Uuid::new_v4();
        let category = categories.seed(owner, "Inbox");

        let err = service
            .create(category.id, Uuid::new_v4(), new_task("sneaky"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CategoryNotFound));

        let err = service
            .create(Uuid::new_v4(), owner, new_task("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CategoryNotFound));

        let task = service.create(category.id, owner, new_task("milk")).await.unwrap();
        assert!(!task.is_checked);
        assert_eq!(task.created_by, owner);
        assert_eq!(task.category_id, category.id);
    }

    #[tokio::test]
    async fn category_owner_sees_tasks_created_by_others() {
        let (service, categories, tasks) = service();
        let owner = Uuid::new_v4();
        let helper = Uuid::new_v4();
        let category = categories.seed(owner, "Shared");
        let first = service.create(category.id, owner, new_task("a")).await.unwrap();
        let second = tasks.seed(category.id, helper, "b");

        let listed = service.list_by_category(category.id, owner).await.unwrap();
        assert_eq!(
            listed.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        // The helper only sees what they created.
        let listed = service.list_by_category(category.id, helper).await.unwrap();
        assert_eq!(listed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id]);
        assert!(service.find(first.id, helper).await.unwrap().is_none());

        let stranger = Uuid::new_v4();
        assert!(service.list_by_category(category.id, stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_updates_keep_untouched_fields() {
        let (service, categories, _) = service();
        let owner = Uuid::new_v4();
        let category = categories.seed(owner, "Inbox");
        let task = service
            .create(
                category.id,
                owner,
                NewTask {
                    name: "call".into(),
                    description: Some("the bank".into()),
                    is_checked: Some(false),
                },
            )
            .await
            .unwrap();

        let checked = service
            .update(
                task.id,
                owner,
                TaskChanges {
                    is_checked: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(checked.is_checked);
        assert_eq!(checked.name, "call");
        assert_eq!(checked.description.as_deref(), Some("the bank"));

        let cleared = service
            .update(
                task.id,
                owner,
                TaskChanges {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.description, None);
        assert!(cleared.is_checked);

        assert!(service.delete(task.id, owner).await.unwrap());
        assert!(!service.delete(task.id, owner).await.unwrap());
    }
}
