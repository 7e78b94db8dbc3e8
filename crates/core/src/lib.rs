//! Core library for Notesphere
//!
//! This crate contains the core business logic, including:
//! - Task and category persistence over SQLite
//! - Task-category links with referential integrity
//! - The kanban board with optimistic drag-and-drop

pub mod board;
pub mod category;
pub mod envelope;
pub mod error;
pub mod patch;
pub mod store;
pub mod task;

pub use error::{Error, ErrorKind};
pub type Result<T> = std::result::Result<T, Error>;
