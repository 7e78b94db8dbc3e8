//! Task module
//!
//! This module contains task-related types and logic.

mod model;
mod repository;
mod sql_store;

pub use model::*;
pub use repository::TaskRepository;
pub use sql_store::SqlTaskStore;
