//! Kanban board: derived columns and optimistic drag-and-drop

mod gateway;
mod model;
mod reconciler;

pub use gateway::{HttpTaskGateway, RepositoryGateway, TaskGateway};
pub use model::*;
pub use reconciler::BoardReconciler;
