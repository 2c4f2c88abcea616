//! VectorStore trait definition.

use super::models::{StoredVector, VectorKind};
use crate::recommender::{ContentUniverse, IndexSnapshot};
use anyhow::Result;

/// Storage surface for per-song vectors, the content universe and the index
/// snapshot artifact.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait VectorStore: Send + Sync {
    /// Save (insert or replace) one of a song's vectors.
    fn save_vector(
        &self,
        song_id: i64,
        kind: VectorKind,
        values: &[f32],
        universe_epoch: Option<i64>,
    ) -> Result<()>;

    /// Load one of a song's vectors.
    /// Returns Ok(None) if the song has no stored vector of that kind.
    fn load_vector(&self, song_id: i64, kind: VectorKind) -> Result<Option<StoredVector>>;

    /// Load all stored vectors of a kind, ordered by ascending song id.
    fn load_all_vectors(&self, kind: VectorKind) -> Result<Vec<StoredVector>>;

    /// Clear all vectors of a kind. Returns the number of rows touched.
    fn clear_vectors(&self, kind: VectorKind) -> Result<usize>;

    /// Delete vector rows for songs no longer in the catalog.
    /// Returns the number of rows deleted.
    fn prune_songs_not_in(&self, keep: &[i64]) -> Result<usize>;

    /// Persist the content universe snapshot.
    fn save_universe(&self, universe: &ContentUniverse) -> Result<()>;

    /// Load the content universe snapshot, if one was generated.
    fn load_universe(&self) -> Result<Option<ContentUniverse>>;

    /// Atomically persist the index snapshot artifact.
    fn save_index_snapshot(&self, snapshot: &IndexSnapshot) -> Result<()>;

    /// Load the index snapshot artifact, if one was built.
    /// Returns Err when the artifact exists but cannot be read or parsed.
    fn load_index_snapshot(&self) -> Result<Option<IndexSnapshot>>;
}
