//! Category module
//!
//! Categories and the link table that ties them to tasks.

pub mod links;
mod model;
mod repository;
mod store;

pub use model::*;
pub use repository::CategoryRepository;
pub use store::SqlCategoryStore;
