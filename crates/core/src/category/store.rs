//! SQL-backed category storage

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{info, instrument, warn};

use super::links;
use super::model::{Category, CategoryId, CategoryUpdate, NewCategory};
use super::repository::CategoryRepository;
use crate::error::map_constraint;
use crate::store::StoreGateway;
use crate::{Error, Result};

/// Category store on top of the entity store gateway
#[derive(Clone)]
pub struct SqlCategoryStore {
    gateway: StoreGateway,
}

impl SqlCategoryStore {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    fn row_to_category(row: &SqliteRow) -> Result<Category> {
        Ok(Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch(conn: &mut SqliteConnection, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(Self::row_to_category).transpose()
    }
}

#[async_trait]
impl CategoryRepository for SqlCategoryStore {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create(&self, input: NewCategory) -> Result<Category> {
        input.validate()?;

        let now = Utc::now();
        let mut tx = self.gateway.begin_write().await?;
        let id: CategoryId = sqlx::query_scalar(
            "INSERT INTO category (name, color, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.color)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint)?;
        tx.commit().await?;

        info!("Created category {} ({})", id, input.name);
        Ok(Category {
            id,
            name: input.name,
            color: input.color,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: CategoryId) -> Result<Category> {
        let mut conn = self.gateway.pool().acquire().await?;
        Self::fetch(&mut conn, id)
            .await?
            .ok_or(Error::CategoryNotFound(id))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM category ORDER BY name ASC")
            .fetch_all(self.gateway.pool())
            .await?;
        rows.iter().map(Self::row_to_category).collect()
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: CategoryId, update: CategoryUpdate) -> Result<Category> {
        update.validate()?;

        let mut tx = self.gateway.begin_write().await?;
        let mut category = Self::fetch(&mut tx, id)
            .await?
            .ok_or(Error::CategoryNotFound(id))?;

        category.apply(update);
        category.updated_at = Utc::now().max(category.updated_at);

        sqlx::query("UPDATE category SET name = ?, color = ?, updated_at = ? WHERE id = ?")
            .bind(&category.name)
            .bind(&category.color)
            .bind(category.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint)?;
        tx.commit().await?;

        info!("Updated category {}", id);
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: CategoryId) -> Result<()> {
        let mut tx = self.gateway.begin_write().await?;

        // Guard and delete in one statement so a link created between a
        // separate check and the delete cannot slip through.
        let deleted = sqlx::query(
            "DELETE FROM category WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM task_category_link WHERE category_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            if Self::fetch(&mut tx, id).await?.is_none() {
                return Err(Error::CategoryNotFound(id));
            }
            let count = links::link_count(&mut tx, id).await?;
            warn!("Refusing to delete category {} linked to {} task(s)", id, count);
            return Err(Error::ReferentialIntegrity(format!(
                "Cannot delete category with associated tasks ({} linked)",
                count
            )));
        }

        tx.commit().await?;
        info!("Deleted category {}", id);
        Ok(())
    }

    async fn task_count(&self, id: CategoryId) -> Result<i64> {
        let mut conn = self.gateway.pool().acquire().await?;
        if Self::fetch(&mut conn, id).await?.is_none() {
            return Err(Error::CategoryNotFound(id));
        }
        links::link_count(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::create_test_gateway;
    use crate::task::{NewTask, SqlTaskStore, TaskRepository};

    #[tokio::test]
    async fn test_create_and_get_category() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        let created = store
            .create(NewCategory::new("Work", "#0044ff"))
            .await
            .unwrap();
        assert_eq!(created.name, "Work");
        assert_eq!(created.color, "#0044ff");

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, created.name);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_get_missing_category() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        match store.get(42).await {
            Err(Error::CategoryNotFound(42)) => {}
            other => panic!("Expected CategoryNotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        store.create(NewCategory::new("Urgent", "red")).await.unwrap();
        let result = store.create(NewCategory::new("Urgent", "orange")).await;

        match result {
            Err(Error::Validation { field, message }) => {
                assert_eq!(field, "name");
                assert!(message.contains("duplicate"));
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }

        let urgent: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.name == "Urgent")
            .collect();
        assert_eq!(urgent.len(), 1);
        assert_eq!(urgent[0].color, "red");
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        for name in ["Zeta", "Alpha", "Mid"] {
            store.create(NewCategory::new(name, "gray")).await.unwrap();
        }

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        let created = store.create(NewCategory::new("Work", "blue")).await.unwrap();
        let updated = store
            .update(
                created.id,
                CategoryUpdate {
                    name: None,
                    color: Some("teal".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Work");
        assert_eq!(updated.color, "teal");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get(created.id).await.unwrap().color, "teal");
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_rejected() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        store.create(NewCategory::new("Work", "blue")).await.unwrap();
        let home = store.create(NewCategory::new("Home", "green")).await.unwrap();

        let result = store
            .update(
                home.id,
                CategoryUpdate {
                    name: Some("Work".to_string()),
                    color: None,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(store.get(home.id).await.unwrap().name, "Home");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_recolors_all_succeed() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);
        let mut ids = Vec::new();
        for name in ["Work", "Home", "Urgent", "Errands", "Later", "Someday"] {
            ids.push(store.create(NewCategory::new(name, "grey")).await.unwrap().id);
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update(
                            id,
                            CategoryUpdate {
                                color: Some("teal".to_string()),
                                ..CategoryUpdate::default()
                            },
                        )
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().color, "teal");
        }
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        let result = store.update(5, CategoryUpdate::default()).await;
        assert!(matches!(result, Err(Error::CategoryNotFound(5))));
    }

    #[tokio::test]
    async fn test_delete_referenced_category_rejected() {
        let (gateway, _temp) = create_test_gateway().await;
        let categories = SqlCategoryStore::new(gateway.clone());
        let tasks = SqlTaskStore::new(gateway);

        let category = categories
            .create(NewCategory::new("Urgent", "red"))
            .await
            .unwrap();
        let task = tasks
            .create(NewTask::new("Linked").with_categories([category.id]))
            .await
            .unwrap();

        match categories.delete(category.id).await {
            Err(Error::ReferentialIntegrity(msg)) => assert!(msg.contains("associated tasks")),
            other => panic!("Expected ReferentialIntegrity error, got: {:?}", other),
        }
        assert!(categories.get(category.id).await.is_ok());
        assert_eq!(categories.task_count(category.id).await.unwrap(), 1);

        // Once the task is gone the category can be deleted
        tasks.delete(task.id).await.unwrap();
        categories.delete(category.id).await.unwrap();
        assert!(matches!(
            categories.get(category.id).await,
            Err(Error::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_category() {
        let (gateway, _temp) = create_test_gateway().await;
        let store = SqlCategoryStore::new(gateway);

        assert!(matches!(
            store.delete(77).await,
            Err(Error::CategoryNotFound(77))
        ));
    }
}
