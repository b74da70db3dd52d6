use std::sync::Arc;

use crate::db::Store;
use crate::services::RecommendationEngine;

/// Shared application state
///
/// The engine drives the recommendation pipeline; the store is exposed
/// directly for rating/history/preference/feedback actions, which
/// bypass the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub store: Store,
}

impl AppState {
    pub fn new(engine: Arc<RecommendationEngine>, store: Store) -> Self {
        Self { engine, store }
    }
}
