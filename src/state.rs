use std::sync::Arc;

use crate::{db::Cache, models::BulkReorderMode, store::OrderStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    /// Listing cache, absent when Redis is not configured
    pub cache: Option<Cache>,
    pub bulk_reorder_mode: BulkReorderMode,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        cache: Option<Cache>,
        bulk_reorder_mode: BulkReorderMode,
    ) -> Self {
        Self {
            store,
            cache,
            bulk_reorder_mode,
        }
    }
}
