//! Collaborative factor training job.
//!
//! Builds the interaction matrix from the current like set and factorizes
//! it into item latent vectors. The matrix is rebuilt every run rather than
//! loaded from a stored intermediate, so training can never see a like set
//! from a different epoch than the id mappings.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::recommender::{train_item_factors, InteractionMatrix};
use crate::vector_store::VectorKind;
use tracing::{info, warn};

const CANCEL_CHECK_INTERVAL: usize = 64;

pub struct TrainCfJob;

impl BackgroundJob for TrainCfJob {
    fn id(&self) -> &'static str {
        "train_cf"
    }

    fn name(&self) -> &'static str {
        "Collaborative Training"
    }

    fn description(&self) -> &'static str {
        "Factorize the user-song interaction matrix into item latent vectors"
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let user_ids = ctx
            .user_store
            .list_user_ids()
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to list users: {:#}", e)))?;
        let songs = ctx
            .catalog_store
            .list_songs()
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to list songs: {:#}", e)))?;
        let song_ids: Vec<i64> = songs.iter().map(|s| s.id).collect();
        let likes = ctx
            .user_store
            .list_likes()
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to list likes: {:#}", e)))?;
        let pairs: Vec<(i64, i64)> = likes.iter().map(|l| (l.user_id, l.song_id)).collect();

        let matrix = InteractionMatrix::build(&user_ids, &song_ids, &pairs);
        info!(
            "Interaction matrix: {} users x {} songs, {} likes",
            matrix.n_users(),
            matrix.n_songs(),
            matrix.nnz()
        );

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let model = train_item_factors(
            &matrix,
            ctx.settings.factors,
            ctx.settings.svd_n_iter,
            ctx.settings.svd_seed,
        );

        // The previous factors are only dropped once the new model exists in
        // memory, so a failed training run leaves them intact.
        ctx.vector_store
            .clear_vectors(VectorKind::Cf)
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to clear cf vectors: {:#}", e)))?;

        let model = match model {
            Some(model) => model,
            None => {
                warn!("No collaborative factors trained; songs fall back to content vectors");
                return Ok(());
            }
        };

        for (i, (song_id, factors)) in model
            .song_ids
            .iter()
            .zip(model.item_factors.iter())
            .enumerate()
        {
            if i % CANCEL_CHECK_INTERVAL == 0 && ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            ctx.vector_store
                .save_vector(*song_id, VectorKind::Cf, factors, None)
                .map_err(|e| {
                    JobError::ExecutionFailed(format!(
                        "Failed to save cf vector for song {}: {:#}",
                        song_id, e
                    ))
                })?;
        }

        info!(
            "Trained SVD (k = {}) and wrote cf vectors for {} songs",
            model.factors,
            model.song_ids.len()
        );
        Ok(())
    }
}
