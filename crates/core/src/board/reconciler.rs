//! Optimistic board state
//!
//! A drag moves the card locally first, then asks the store to persist the
//! new status. On failure the whole local collection is restored from the
//! snapshot taken at drag time. That restore also reverts any other
//! optimistic move still in flight. The board then resyncs from the store,
//! keeping the local status of cards that are still pending, so moves the
//! store never accepted do not linger.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::gateway::TaskGateway;
use super::model::{group_into_columns, BoardColumn, CardState, DragOutcome, DropTarget};
use crate::task::{Task, TaskId, TaskStatus, TaskUpdate};
use crate::Result;

#[derive(Default)]
struct BoardState {
    tasks: Vec<Task>,
    cards: HashMap<TaskId, CardState>,
    /// Bumped on every committed update; stale refreshes are discarded
    generation: u64,
}

impl BoardState {
    fn card(&self, id: TaskId) -> CardState {
        self.cards.get(&id).copied().unwrap_or_default()
    }

    fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.iter().find(|t| t.id == id).map(|t| t.status)
    }

    /// Replace the collection with fresh data, keeping the local status of
    /// cards whose update is still in flight.
    fn absorb(&mut self, fresh: Vec<Task>) {
        let pending: HashMap<TaskId, TaskStatus> = self
            .tasks
            .iter()
            .filter(|t| self.card(t.id) == CardState::Pending)
            .map(|t| (t.id, t.status))
            .collect();

        self.tasks = fresh
            .into_iter()
            .map(|mut task| {
                if let Some(status) = pending.get(&task.id) {
                    task.status = *status;
                }
                task
            })
            .collect();

        let present: HashSet<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        self.cards.retain(|id, _| present.contains(id));
    }

    fn replace_task(&mut self, stored: &Task) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == stored.id) {
            *task = stored.clone();
        }
    }
}

/// Client-side board that applies drag-and-drop moves optimistically
pub struct BoardReconciler<G: TaskGateway> {
    gateway: Arc<G>,
    state: Arc<RwLock<BoardState>>,
    refresh_after_commit: bool,
}

impl<G: TaskGateway> Clone for BoardReconciler<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
            refresh_after_commit: self.refresh_after_commit,
        }
    }
}

impl<G: TaskGateway> BoardReconciler<G> {
    /// Create an empty board; call [`load`](Self::load) to populate it
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(BoardState::default())),
            refresh_after_commit: true,
        }
    }

    /// Enable or disable the background refresh after a committed move
    pub fn with_refresh_after_commit(mut self, enabled: bool) -> Self {
        self.refresh_after_commit = enabled;
        self
    }

    /// Fetch every task from the store
    pub async fn load(&self) -> Result<()> {
        let generation = self.state.read().await.generation;
        let tasks = self.gateway.fetch_tasks().await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Discarding stale board refresh");
            return Ok(());
        }
        state.absorb(tasks);
        Ok(())
    }

    /// Refresh without blocking the caller. Failures are logged only.
    pub fn refresh_in_background(&self) -> JoinHandle<()> {
        let board = self.clone();
        tokio::spawn(async move {
            if let Err(e) = board.load().await {
                warn!("Background board refresh failed: {}", e);
            }
        })
    }

    /// Current local tasks, in store order
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    /// Current columns, derived from the local tasks
    pub async fn columns(&self) -> Vec<BoardColumn> {
        group_into_columns(&self.state.read().await.tasks)
    }

    pub async fn card_state(&self, id: TaskId) -> CardState {
        self.state.read().await.card(id)
    }

    /// Handle the end of a drag gesture.
    ///
    /// `target` is `None` when the card was released outside any column.
    pub async fn drag_end(&self, task_id: TaskId, target: Option<DropTarget>) -> DragOutcome {
        let (snapshot, status) = {
            let mut state = self.state.write().await;

            let Some(current) = state.status_of(task_id) else {
                return DragOutcome::Ignored;
            };
            let target_status = match target {
                None => return DragOutcome::Ignored,
                Some(DropTarget::Card(other)) if other == task_id => {
                    return DragOutcome::Ignored
                }
                Some(DropTarget::Card(other)) => match state.status_of(other) {
                    Some(status) => status,
                    None => return DragOutcome::Ignored,
                },
                Some(DropTarget::Column(status)) => status,
            };
            if target_status == current {
                return DragOutcome::Ignored;
            }
            if state.card(task_id) != CardState::Settled {
                debug!("Task {} still has an update in flight", task_id);
                return DragOutcome::Busy;
            }

            let snapshot = state.tasks.clone();
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) {
                task.status = target_status;
            }
            state.cards.insert(task_id, CardState::Pending);
            (snapshot, target_status)
        };

        debug!("Moving task {} to {}", task_id, status);
        match self
            .gateway
            .update_task(task_id, TaskUpdate::status(status))
            .await
        {
            Ok(stored) => {
                {
                    let mut state = self.state.write().await;
                    state.generation += 1;
                    state.cards.remove(&task_id);
                    state.replace_task(&stored);
                }
                info!("Task {} moved to {}", task_id, stored.status);
                if self.refresh_after_commit {
                    self.refresh_in_background();
                }
                DragOutcome::Committed(stored)
            }
            Err(err) => {
                warn!("Moving task {} failed, restoring board: {}", task_id, err);
                {
                    let mut state = self.state.write().await;
                    state.tasks = snapshot;
                    state.cards.insert(task_id, CardState::RollingBack);
                }

                // The card stays RollingBack until the store view is back
                if let Err(e) = self.load().await {
                    warn!("Resync after rollback of task {} failed: {}", task_id, e);
                }
                self.state.write().await.cards.remove(&task_id);
                DragOutcome::RolledBack(err)
            }
        }
    }
}
