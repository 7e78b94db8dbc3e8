//! Application state

use std::sync::Arc;

use notesphere_core::category::{CategoryRepository, SqlCategoryStore};
use notesphere_core::store::StoreGateway;
use notesphere_core::task::{SqlTaskStore, TaskRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    gateway: StoreGateway,
    task_store: Arc<dyn TaskRepository>,
    category_store: Arc<dyn CategoryRepository>,
}

impl AppState {
    /// Build the repositories over an open store
    pub fn new(gateway: StoreGateway) -> Self {
        let task_store = Arc::new(SqlTaskStore::new(gateway.clone()));
        let category_store = Arc::new(SqlCategoryStore::new(gateway.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                gateway,
                task_store,
                category_store,
            }),
        }
    }

    pub fn gateway(&self) -> &StoreGateway {
        &self.inner.gateway
    }

    pub fn task_store(&self) -> &dyn TaskRepository {
        self.inner.task_store.as_ref()
    }

    pub fn category_store(&self) -> &dyn CategoryRepository {
        self.inner.category_store.as_ref()
    }
}
