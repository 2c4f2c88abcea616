//! Index build job.
//!
//! Collects all stored hybrid vectors, normalizes them into a fresh index
//! snapshot and atomically replaces the persisted artifact. The snapshot and
//! its position -> song id mapping are one structure by construction.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::recommender::{FusedVector, IndexSnapshot};
use crate::vector_store::VectorKind;
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::info;

pub struct BuildIndexJob;

impl BackgroundJob for BuildIndexJob {
    fn id(&self) -> &'static str {
        "build_index"
    }

    fn name(&self) -> &'static str {
        "Build Index"
    }

    fn description(&self) -> &'static str {
        "Build the inner-product index over normalized hybrid vectors"
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let hybrids = ctx
            .vector_store
            .load_all_vectors(VectorKind::Hybrid)
            .map_err(|e| {
                JobError::ExecutionFailed(format!("Failed to load hybrid vectors: {:#}", e))
            })?;

        let epochs: BTreeSet<i64> = hybrids.iter().filter_map(|v| v.universe_epoch).collect();
        if epochs.len() > 1 {
            return Err(JobError::ExecutionFailed(format!(
                "Hybrid vectors span {} universe epochs ({:?}); rerun the pipeline from content vectors",
                epochs.len(),
                epochs
            )));
        }
        let epoch = epochs.into_iter().next();

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let entries: Vec<FusedVector> = hybrids
            .into_iter()
            .map(|v| FusedVector {
                song_id: v.song_id,
                vector: v.values,
            })
            .collect();
        let total = entries.len();

        let snapshot = IndexSnapshot::build(&entries, epoch, Utc::now().timestamp())
            .map_err(|e| JobError::ExecutionFailed(format!("Index build rejected vectors: {}", e)))?;

        ctx.vector_store
            .save_index_snapshot(&snapshot)
            .map_err(|e| {
                JobError::ExecutionFailed(format!("Failed to persist index snapshot: {:#}", e))
            })?;

        info!(
            "Indexed {} of {} hybrid vectors (dimension {}, {} dropped as degenerate)",
            snapshot.len(),
            total,
            snapshot.dimension(),
            total - snapshot.len()
        );
        Ok(())
    }
}
