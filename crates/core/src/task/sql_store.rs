//! SQL-backed task storage
//!
//! Every multi-statement operation runs in one transaction obtained from the
//! [`StoreGateway`]; an early return drops the transaction and rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::model::{NewTask, Task, TaskId, TaskStatus, TaskUpdate};
use super::repository::TaskRepository;
use crate::category::{links, CategoryId};
use crate::store::StoreGateway;
use crate::{Error, Result};

/// Task store on top of the entity store gateway
#[derive(Clone)]
pub struct SqlTaskStore {
    gateway: StoreGateway,
}

impl SqlTaskStore {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    fn row_to_task(row: &SqliteRow, category_ids: Vec<CategoryId>) -> Result<Task> {
        let status: String = row.try_get("status")?;
        let priority: String = row.try_get("priority")?;

        Ok(Task {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: status.parse()?,
            priority: priority.parse()?,
            due_date: row.try_get("due_date")?,
            category_ids,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch(conn: &mut SqliteConnection, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM task WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let category_ids = links::category_ids_for(conn, id).await?;
                Ok(Some(Self::row_to_task(&row, category_ids)?))
            }
            None => Ok(None),
        }
    }

    async fn fetch_many(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        // Rows and links are read from one snapshot
        let mut tx = self.gateway.begin().await?;

        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM task WHERE status = ? ORDER BY id DESC",
                )
                .bind(status.as_str())
                .fetch_all(&mut *tx)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM task ORDER BY id DESC")
                    .fetch_all(&mut *tx)
                    .await?
            }
        };
        let mut all_links: HashMap<TaskId, Vec<CategoryId>> = links::all_links(&mut tx).await?;
        tx.commit().await?;

        rows.iter()
            .map(|row| {
                let id: TaskId = row.try_get("id")?;
                Self::row_to_task(row, all_links.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

/// Next `updated_at` for a row; never moves backwards.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

#[async_trait]
impl TaskRepository for SqlTaskStore {
    #[instrument(skip(self, input), fields(title = %input.title))]
    async fn create(&self, input: NewTask) -> Result<Task> {
        input.validate()?;

        let now = Utc::now();
        let status = input.status.unwrap_or_default();
        let priority = input.priority.unwrap_or_default();

        let mut tx = self.gateway.begin_write().await?;
        let id: TaskId = sqlx::query_scalar(
            "INSERT INTO task (title, description, status, priority, due_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(status.as_str())
        .bind(priority.as_str())
        .bind(input.due_date)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let category_ids = if input.category_ids.is_empty() {
            Vec::new()
        } else {
            links::replace_links(&mut tx, id, &input.category_ids).await?
        };
        tx.commit().await?;

        info!("Created task {}", id);
        Ok(Task {
            id,
            title: input.title,
            description: input.description,
            status,
            priority,
            due_date: input.due_date,
            category_ids,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: TaskId) -> Result<Task> {
        let mut tx = self.gateway.begin().await?;
        let task = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;
        task.ok_or(Error::TaskNotFound(id))
    }

    async fn list(&self) -> Result<Vec<Task>> {
        self.fetch_many(None).await
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        update.validate()?;

        let mut tx = self.gateway.begin_write().await?;
        let mut task = Self::fetch(&mut tx, id)
            .await?
            .ok_or(Error::TaskNotFound(id))?;

        if !update.has_scalar_changes() && update.category_ids.is_none() {
            debug!("Empty update for task {}", id);
            return Ok(task);
        }

        let category_ids = update.category_ids.clone();
        task.apply(update);
        task.updated_at = next_timestamp(task.updated_at);

        sqlx::query(
            "UPDATE task SET title = ?, description = ?, status = ?, priority = ?, \
             due_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(category_ids) = category_ids {
            links::replace_links(&mut tx, id, &category_ids).await?;
        }

        tx.commit().await?;
        info!("Updated task {} (status {})", id, task.status);

        self.get(id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: TaskId) -> Result<()> {
        let mut tx = self.gateway.begin_write().await?;

        let exists: Option<TaskId> = sqlx::query_scalar("SELECT id FROM task WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::TaskNotFound(id));
        }

        let removed = links::remove_links(&mut tx, id).await?;
        sqlx::query("DELETE FROM task WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Removed {} link(s) with task {}", removed, id);
        info!("Deleted task {}", id);
        Ok(())
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.fetch_many(Some(status)).await
    }
}
