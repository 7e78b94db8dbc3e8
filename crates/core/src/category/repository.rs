//! Category repository trait

use async_trait::async_trait;

use super::model::{Category, CategoryId, CategoryUpdate, NewCategory};
use crate::Result;

/// Repository interface for category CRUD operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category; names are unique
    async fn create(&self, input: NewCategory) -> Result<Category>;

    /// Get a category by ID
    async fn get(&self, id: CategoryId) -> Result<Category>;

    /// Get all categories, ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Apply a partial update
    async fn update(&self, id: CategoryId, update: CategoryUpdate) -> Result<Category>;

    /// Delete a category that no task references
    async fn delete(&self, id: CategoryId) -> Result<()>;

    /// Number of tasks tagged with the category
    async fn task_count(&self, id: CategoryId) -> Result<i64>;
}
