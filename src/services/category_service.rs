use std::sync::Arc;

use uuid::Uuid;

use super::ServiceError;
use crate::database::models::Category;
use crate::database::pagination::PaginatedResult;
use crate::database::repositories::{
    CategoryRepository, CreateCategoryParams, ListCategoriesParams, UpdateCategoryParams,
};

/// Category use cases. The acting user is stamped on every write.
#[derive(Clone)]
pub struct CategoryService {
    repository: Arc<dyn CategoryRepository>,
    default_limit: u32,
}

impl CategoryService {
    pub fn new(repository: Arc<dyn CategoryRepository>, default_limit: u32) -> Self {
        Self {
            repository,
            default_limit,
        }
    }

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
        cursor: Option<String>,
    ) -> Result<PaginatedResult<Category>, ServiceError> {
        let limit = limit.unwrap_or(self.default_limit);
        let page = self
            .repository
            .list_by_user_id(ListCategoriesParams {
                user_id,
                limit: i64::from(limit),
                cursor,
            })
            .await?;
        Ok(page)
    }

    pub async fn find(
        &self,
        category_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Category>, ServiceError> {
        Ok(self.repository.find_by_id(category_id, Some(user_id)).await?)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        name: String,
        kind: String,
    ) -> Result<Category, ServiceError> {
        let category = self
            .repository
            .create(CreateCategoryParams {
                name,
                kind,
                created_by: user_id,
                updated_by: user_id,
            })
            .await?;
        tracing::debug!(category_id = %category.id, user_id = %user_id, "category created");
        Ok(category)
    }

    pub async fn rename(
        &self,
        category_id: Uuid,
        user_id: Uuid,
        name: String,
    ) -> Result<Option<Category>, ServiceError> {
        Ok(self
            .repository
            .update(UpdateCategoryParams {
                category_id,
                user_id,
                name,
                updated_by: user_id,
            })
            .await?)
    }

    pub async fn delete(&self, category_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.repository.delete(category_id, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::cursor::{encode_cursor, CursorKey};
    use crate::testing::InMemoryCategories;

    #[tokio::test]
    async fn omitted_limit_uses_the_default() {
        let repo = Arc::new(InMemoryCategories::default());
        let owner = Uuid::new_v4();
        for i in 0..5 {
            repo.seed(owner, &format!("c{}", i));
        }
        let service = CategoryService::new(repo, 2);

        let page = service.list_by_user(owner, None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);

        let page = service.list_by_user(owner, Some(10), None).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn cursor_ids_are_read_as_uuids() {
        let repo = Arc::new(InMemoryCategories::default());
        let owner = Uuid::new_v4();
        let oldest = repo.seed(owner, "oldest");
        let middle = repo.seed(owner, "middle");
        let newest = repo.seed(owner, "newest");
        let service = CategoryService::new(repo, 20);

        // A non-UUID id is ignored, so listing restarts from the newest row.
        let bogus = encode_cursor(&CursorKey::new(middle.created_at, "c2"));
        let page = service.list_by_user(owner, Some(1), Some(bogus)).await.unwrap();
        assert_eq!(page.items, vec![newest]);

        // Uppercase spelling of a UUID still bounds the page.
        let upper = encode_cursor(&CursorKey::new(
            middle.created_at,
            middle.id.to_string().to_uppercase(),
        ));
        let page = service.list_by_user(owner, Some(5), Some(upper)).await.unwrap();
        assert_eq!(page.items, vec![oldest]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn writes_are_stamped_with_the_acting_user() {
        let repo = Arc::new(InMemoryCategories::default());
        let service = CategoryService::new(repo, 20);
        let user = Uuid::new_v4();

        let created = service.create(user, "Work".into(), "user".into()).await.unwrap();
        assert_eq!(created.created_by, user);
        assert_eq!(created.updated_by, user);

        let stranger = Uuid::new_v4();
        assert!(service.find(created.id, stranger).await.unwrap().is_none());
        assert!(service
            .rename(created.id, stranger, "Mine".into())
            .await
            .unwrap()
            .is_none());
        assert!(!service.delete(created.id, stranger).await.unwrap());

        let renamed = service
            .rename(created.id, user, "Office".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Office");
        assert!(service.delete(created.id, user).await.unwrap());
        assert!(service.find(created.id, user).await.unwrap().is_none());
    }
}
