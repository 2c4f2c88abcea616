//! The offline recommendation pipeline jobs, in execution order:
//! content vectors, collaborative training, fusion, index build.

mod build_index;
mod content_vectors;
mod hybrid_vectors;
mod train_cf;

pub use build_index::BuildIndexJob;
pub use content_vectors::ContentVectorsJob;
pub use hybrid_vectors::HybridVectorsJob;
pub use train_cf::TrainCfJob;

use super::BackgroundJob;
use std::sync::Arc;

/// The full pipeline in dependency order.
pub fn pipeline_jobs() -> Vec<Arc<dyn BackgroundJob>> {
    vec![
        Arc::new(ContentVectorsJob),
        Arc::new(TrainCfJob),
        Arc::new(HybridVectorsJob),
        Arc::new(BuildIndexJob),
    ]
}
