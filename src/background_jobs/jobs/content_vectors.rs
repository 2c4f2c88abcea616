//! Content vector generation job.
//!
//! Rebuilds the artist/genre universe from the current catalog and encodes
//! every song against it. Regeneration replaces the stored universe and all
//! content vectors; downstream vectors must be refused afterwards.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::recommender::ContentUniverse;
use crate::vector_store::VectorKind;
use chrono::Utc;
use indicatif::ProgressBar;
use tracing::info;

const CANCEL_CHECK_INTERVAL: usize = 64;

pub struct ContentVectorsJob;

impl BackgroundJob for ContentVectorsJob {
    fn id(&self) -> &'static str {
        "content_vectors"
    }

    fn name(&self) -> &'static str {
        "Content Vectors"
    }

    fn description(&self) -> &'static str {
        "Generate one-hot content vectors over the artist/genre universe"
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let songs = ctx
            .catalog_store
            .list_songs()
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to list songs: {:#}", e)))?;

        if songs.is_empty() {
            info!("Catalog is empty, nothing to encode");
            return Ok(());
        }

        let epoch = Utc::now().timestamp();
        let universe = ContentUniverse::from_songs(&songs, epoch);
        info!(
            "Content universe: {} artists + {} genres = dimension {} (epoch {})",
            universe.artists.len(),
            universe.genres.len(),
            universe.dimension(),
            epoch
        );

        ctx.vector_store.save_universe(&universe).map_err(|e| {
            JobError::ExecutionFailed(format!("Failed to save universe: {:#}", e))
        })?;

        let progress = ProgressBar::new(songs.len() as u64);
        for (i, song) in songs.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let vector = universe.encode(song);
            ctx.vector_store
                .save_vector(song.id, VectorKind::Content, &vector, Some(epoch))
                .map_err(|e| {
                    JobError::ExecutionFailed(format!(
                        "Failed to save content vector for song {}: {:#}",
                        song.id, e
                    ))
                })?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        let song_ids: Vec<i64> = songs.iter().map(|s| s.id).collect();
        let pruned = ctx
            .vector_store
            .prune_songs_not_in(&song_ids)
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to prune rows: {:#}", e)))?;

        info!(
            "Generated {} content vectors (dimension {}), pruned {} stale rows",
            songs.len(),
            universe.dimension(),
            pruned
        );
        Ok(())
    }
}
