//! Board model definitions
//!
//! Columns are never stored; they are derived from the flat task list on
//! every read.

use serde::Serialize;
use std::cmp::Ordering;

use crate::task::{Task, TaskId, TaskStatus};
use crate::Error;

/// Lifecycle of a card with respect to its last status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    #[default]
    Settled,
    /// Local status changed, update request in flight
    Pending,
    /// Update failed, local collection being restored
    RollingBack,
}

/// Where a dragged card was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Empty space of a column
    Column(TaskStatus),
    /// On top of another card; the card's column is the target
    Card(TaskId),
}

/// Result of handling a drag-end event
#[derive(Debug)]
pub enum DragOutcome {
    /// Same column, onto itself, or nowhere; nothing was sent
    Ignored,
    /// An earlier update for this card is still in flight
    Busy,
    /// The store accepted the new status
    Committed(Task),
    /// The update failed and the board was restored to its pre-drag state
    RolledBack(Error),
}

impl DragOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// A column in the board
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub title: String,
    pub tasks: Vec<Task>,
}

/// Group tasks into the three columns, each sorted for display
pub fn group_into_columns(tasks: &[Task]) -> Vec<BoardColumn> {
    TaskStatus::ALL
        .iter()
        .map(|status| {
            let mut column: Vec<Task> = tasks
                .iter()
                .filter(|task| task.status == *status)
                .cloned()
                .collect();
            column.sort_by(compare_cards);
            BoardColumn {
                status: *status,
                title: status.title().to_string(),
                tasks: column,
            }
        })
        .collect()
}

/// Priority first (HIGH before LOW), then earliest due date, undated last
pub fn compare_cards(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}
