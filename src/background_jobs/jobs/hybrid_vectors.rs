//! Hybrid vector fusion job.
//!
//! Joins the stored content and cf vectors per song and writes the fused
//! hybrid vectors. Fusion refuses inputs from mixed universe epochs.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::recommender::{fuse_all, VectorPair};
use crate::vector_store::VectorKind;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use tracing::info;

const CANCEL_CHECK_INTERVAL: usize = 64;

pub struct HybridVectorsJob;

impl BackgroundJob for HybridVectorsJob {
    fn id(&self) -> &'static str {
        "hybrid_vectors"
    }

    fn name(&self) -> &'static str {
        "Hybrid Vectors"
    }

    fn description(&self) -> &'static str {
        "Fuse content and cf vectors into per-song hybrid vectors"
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let content = ctx
            .vector_store
            .load_all_vectors(VectorKind::Content)
            .map_err(|e| {
                JobError::ExecutionFailed(format!("Failed to load content vectors: {:#}", e))
            })?;
        let cf = ctx
            .vector_store
            .load_all_vectors(VectorKind::Cf)
            .map_err(|e| {
                JobError::ExecutionFailed(format!("Failed to load cf vectors: {:#}", e))
            })?;

        let mut pairs: BTreeMap<i64, VectorPair> = BTreeMap::new();
        for vector in content {
            let pair = pairs.entry(vector.song_id).or_insert_with(|| VectorPair {
                song_id: vector.song_id,
                cf: None,
                content: None,
                universe_epoch: None,
            });
            pair.content = Some(vector.values);
            pair.universe_epoch = vector.universe_epoch;
        }
        for vector in cf {
            pairs
                .entry(vector.song_id)
                .or_insert_with(|| VectorPair {
                    song_id: vector.song_id,
                    cf: None,
                    content: None,
                    universe_epoch: None,
                })
                .cf = Some(vector.values);
        }
        let pairs: Vec<VectorPair> = pairs.into_values().collect();

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let epoch = pairs.iter().find_map(|p| p.universe_epoch);
        let fused = fuse_all(&pairs)
            .map_err(|e| JobError::ExecutionFailed(format!("Fusion rejected inputs: {}", e)))?;

        // Previous hybrids are replaced wholesale; songs that lost both
        // source vectors lose their hybrid too.
        ctx.vector_store
            .clear_vectors(VectorKind::Hybrid)
            .map_err(|e| {
                JobError::ExecutionFailed(format!("Failed to clear hybrid vectors: {:#}", e))
            })?;

        let progress = ProgressBar::new(fused.len() as u64);
        for (i, entry) in fused.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            ctx.vector_store
                .save_vector(entry.song_id, VectorKind::Hybrid, &entry.vector, epoch)
                .map_err(|e| {
                    JobError::ExecutionFailed(format!(
                        "Failed to save hybrid vector for song {}: {:#}",
                        entry.song_id, e
                    ))
                })?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Fused hybrid vectors for {} of {} songs",
            fused.len(),
            pairs.len()
        );
        Ok(())
    }
}
