//! Task repository trait
//!
//! Defines the interface for task storage operations.

use async_trait::async_trait;

use super::model::{NewTask, Task, TaskId, TaskStatus, TaskUpdate};
use crate::Result;

/// Repository interface for task CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task, optionally tagged with categories
    async fn create(&self, input: NewTask) -> Result<Task>;

    /// Get a task by ID, with its category ids
    async fn get(&self, id: TaskId) -> Result<Task>;

    /// Get all tasks, most recently created first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Apply a partial update atomically and return the stored result
    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<Task>;

    /// Delete a task and its category links
    async fn delete(&self, id: TaskId) -> Result<()>;

    /// Find tasks by status, newest first
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>>;
}
