//! Task/category link maintenance
//!
//! All functions take a plain connection so callers decide the transaction
//! boundary. Mutating functions must be given a connection that belongs to a
//! transaction; the link set of a task is only ever replaced as a whole.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::model::CategoryId;
use crate::error::map_constraint;
use crate::task::TaskId;
use crate::{Error, Result};

/// Replace every link of `task_id` with one link per id in `category_ids`.
///
/// Duplicates are collapsed keeping the first occurrence. Every id must name
/// an existing category, otherwise nothing is written and
/// [`Error::ReferentialIntegrity`] is returned. The task itself must exist;
/// checking that is the caller's job. Returns the ids as stored.
pub async fn replace_links(
    conn: &mut SqliteConnection,
    task_id: TaskId,
    category_ids: &[CategoryId],
) -> Result<Vec<CategoryId>> {
    let wanted = dedup(category_ids);

    let missing = missing_categories(conn, &wanted).await?;
    if !missing.is_empty() {
        return Err(Error::ReferentialIntegrity(format!(
            "categories do not exist: {}",
            join_ids(&missing)
        )));
    }

    let removed = sqlx::query("DELETE FROM task_category_link WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    for category_id in &wanted {
        sqlx::query("INSERT INTO task_category_link (task_id, category_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .map_err(map_constraint)?;
    }

    debug!(
        "Replaced links of task {}: removed {}, inserted {}",
        task_id,
        removed,
        wanted.len()
    );
    Ok(wanted)
}

/// Remove every link of a task. Returns how many were removed.
pub async fn remove_links(conn: &mut SqliteConnection, task_id: TaskId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM task_category_link WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Category ids linked to a task, in link insertion order
pub async fn category_ids_for(
    conn: &mut SqliteConnection,
    task_id: TaskId,
) -> Result<Vec<CategoryId>> {
    let ids = sqlx::query_scalar(
        "SELECT category_id FROM task_category_link WHERE task_id = ? ORDER BY rowid",
    )
    .bind(task_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// Category ids of every task that has at least one link
pub async fn all_links(conn: &mut SqliteConnection) -> Result<HashMap<TaskId, Vec<CategoryId>>> {
    let rows: Vec<(TaskId, CategoryId)> =
        sqlx::query_as("SELECT task_id, category_id FROM task_category_link ORDER BY rowid")
            .fetch_all(&mut *conn)
            .await?;

    let mut links: HashMap<TaskId, Vec<CategoryId>> = HashMap::new();
    for (task_id, category_id) in rows {
        links.entry(task_id).or_default().push(category_id);
    }
    Ok(links)
}

/// Number of tasks tagged with a category
pub async fn link_count(conn: &mut SqliteConnection, category_id: CategoryId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM task_category_link WHERE category_id = ?")
        .bind(category_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Whether a category is free of links and may be deleted.
///
/// This is advisory on its own; category deletion re-checks inside its
/// delete statement.
pub async fn can_delete_category(
    conn: &mut SqliteConnection,
    category_id: CategoryId,
) -> Result<bool> {
    Ok(link_count(conn, category_id).await? == 0)
}

async fn missing_categories(
    conn: &mut SqliteConnection,
    wanted: &[CategoryId],
) -> Result<Vec<CategoryId>> {
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM category WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in wanted {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: HashSet<CategoryId> = builder
        .build_query_scalar::<CategoryId>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    Ok(wanted
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

fn dedup(ids: &[CategoryId]) -> Vec<CategoryId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn join_ids(ids: &[CategoryId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
