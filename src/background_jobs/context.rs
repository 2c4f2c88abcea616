use crate::catalog_store::CatalogStore;
use crate::config::RecommenderSettings;
use crate::user_store::UserStore;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
///
/// Contains references to shared resources and a cancellation token for
/// graceful shutdown handling.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// Access to the song catalog.
    pub catalog_store: Arc<dyn CatalogStore>,

    /// Access to users and likes.
    pub user_store: Arc<dyn UserStore>,

    /// Access to vector and snapshot storage.
    pub vector_store: Arc<dyn VectorStore>,

    /// Recommender tunables (factor count, SVD iterations, seed).
    pub settings: RecommenderSettings,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        catalog_store: Arc<dyn CatalogStore>,
        user_store: Arc<dyn UserStore>,
        vector_store: Arc<dyn VectorStore>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            cancellation_token,
            catalog_store,
            user_store,
            vector_store,
            settings,
        }
    }

    /// Check if cancellation has been requested.
    ///
    /// Jobs should periodically check this during long-running operations
    /// and return early with `JobError::Cancelled` if true.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
