//! Online retrieval over the hybrid vector index.
//!
//! The index snapshot is process-wide state with an explicit lifecycle:
//! loaded once on first use under a mutual-exclusion guard, replaced
//! wholesale after a rebuild. Readers only ever see a complete snapshot.

use super::error::RecommendError;
use super::index::{l2_normalize, IndexSnapshot};
use crate::vector_store::VectorStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Capability interface over the two recommendation strategies (indexed ANN
/// and dense matrix scoring).
pub trait Recommender: Send + Sync {
    /// Rank up to `top_n` songs similar to the seed set, never returning an
    /// id present in `exclude`. An empty seed set yields an empty result.
    fn recommend(
        &self,
        seed_song_ids: &[i64],
        top_n: usize,
        exclude: &[i64],
    ) -> Result<Vec<i64>, RecommendError>;

    /// Recommend songs not already in the seed set.
    fn recommend_unseen(
        &self,
        seed_song_ids: &[i64],
        top_n: usize,
    ) -> Result<Vec<i64>, RecommendError> {
        self.recommend(seed_song_ids, top_n, seed_song_ids)
    }
}

/// Holder of the lazily loaded index snapshot.
///
/// Concurrent first queries race to trigger the load; the `load_guard`
/// mutex ensures exactly one of them builds the cached copy. A rebuild
/// swaps in a fresh `Arc` so in-flight readers keep their consistent view.
#[derive(Default)]
pub struct IndexHandle {
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
    load_guard: Mutex<()>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently cached snapshot, if one was loaded or installed.
    pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    /// Return the cached snapshot, loading it from storage on first use.
    pub fn get_or_load(
        &self,
        store: &dyn VectorStore,
    ) -> Result<Arc<IndexSnapshot>, RecommendError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let _guard = self.load_guard.lock().unwrap();
        // Another first query may have completed the load while we waited.
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let loaded = store.load_index_snapshot().map_err(|e| {
            RecommendError::IndexUnavailable(format!("failed to load index snapshot: {:#}", e))
        })?;
        let snapshot = loaded.ok_or_else(|| {
            RecommendError::IndexUnavailable("no index snapshot has been built".to_string())
        })?;

        info!(
            "Loaded index snapshot: {} songs, dimension {}",
            snapshot.len(),
            snapshot.dimension()
        );
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().unwrap() = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Install a freshly built snapshot, replacing the previous one
    /// wholesale.
    pub fn replace(&self, snapshot: IndexSnapshot) {
        *self.snapshot.write().unwrap() = Some(Arc::new(snapshot));
    }

    /// Drop the cached snapshot; the next query reloads from storage.
    pub fn invalidate(&self) {
        *self.snapshot.write().unwrap() = None;
    }
}

/// Index-backed recommender: averages the seed vectors into a query and
/// runs an oversampled exact search to survive exclusion filtering.
pub struct AnnRecommender {
    vector_store: Arc<dyn VectorStore>,
    index: IndexHandle,
    oversample_factor: usize,
}

impl AnnRecommender {
    pub fn new(vector_store: Arc<dyn VectorStore>, oversample_factor: usize) -> Self {
        Self {
            vector_store,
            index: IndexHandle::new(),
            oversample_factor,
        }
    }

    /// Access to the underlying snapshot holder, e.g. to swap in a rebuild.
    pub fn index_handle(&self) -> &IndexHandle {
        &self.index
    }
}

impl Recommender for AnnRecommender {
    fn recommend(
        &self,
        seed_song_ids: &[i64],
        top_n: usize,
        exclude: &[i64],
    ) -> Result<Vec<i64>, RecommendError> {
        if seed_song_ids.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let snapshot = self.index.get_or_load(self.vector_store.as_ref())?;
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        // Component-wise mean of the seed vectors that are indexed.
        let mut query = vec![0.0f32; snapshot.dimension()];
        let mut seeds_found = 0usize;
        for &seed in seed_song_ids {
            match snapshot.vector_for(seed) {
                Some(vector) => {
                    for (q, x) in query.iter_mut().zip(vector.iter()) {
                        *q += x;
                    }
                    seeds_found += 1;
                }
                None => debug!("Seed song {} has no indexed vector, skipping", seed),
            }
        }
        if seeds_found == 0 {
            return Ok(Vec::new());
        }
        let inverse = 1.0 / seeds_found as f32;
        for q in query.iter_mut() {
            *q *= inverse;
        }
        if !l2_normalize(&mut query) {
            return Ok(Vec::new());
        }

        let pool_size = top_n
            .saturating_mul(self.oversample_factor)
            .saturating_add(seed_song_ids.len())
            .min(snapshot.len());
        let hits = snapshot.search(&query, pool_size)?;

        let excluded: HashSet<i64> = exclude.iter().copied().collect();
        Ok(hits
            .into_iter()
            .filter(|hit| !excluded.contains(&hit.song_id))
            .map(|hit| hit.song_id)
            .take(top_n)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::content::ContentUniverse;
    use crate::recommender::hybrid::FusedVector;
    use crate::vector_store::{StoredVector, VectorKind};
    use anyhow::Result;

    /// Store stub for tests that pre-install a snapshot via the handle; no
    /// call should ever reach storage.
    struct UnreachableStore;

    impl VectorStore for UnreachableStore {
        fn save_vector(&self, _: i64, _: VectorKind, _: &[f32], _: Option<i64>) -> Result<()> {
            unreachable!()
        }
        fn load_vector(&self, _: i64, _: VectorKind) -> Result<Option<StoredVector>> {
            unreachable!()
        }
        fn load_all_vectors(&self, _: VectorKind) -> Result<Vec<StoredVector>> {
            unreachable!()
        }
        fn clear_vectors(&self, _: VectorKind) -> Result<usize> {
            unreachable!()
        }
        fn prune_songs_not_in(&self, _: &[i64]) -> Result<usize> {
            unreachable!()
        }
        fn save_universe(&self, _: &ContentUniverse) -> Result<()> {
            unreachable!()
        }
        fn load_universe(&self) -> Result<Option<ContentUniverse>> {
            unreachable!()
        }
        fn save_index_snapshot(&self, _: &IndexSnapshot) -> Result<()> {
            unreachable!()
        }
        fn load_index_snapshot(&self) -> Result<Option<IndexSnapshot>> {
            Ok(None)
        }
    }

    fn recommender_with(vectors: Vec<(i64, Vec<f32>)>) -> AnnRecommender {
        let entries: Vec<FusedVector> = vectors
            .into_iter()
            .map(|(song_id, vector)| FusedVector { song_id, vector })
            .collect();
        let snapshot = IndexSnapshot::build(&entries, None, 0).unwrap();

        let recommender = AnnRecommender::new(Arc::new(UnreachableStore), 5);
        recommender.index_handle().replace(snapshot);
        recommender
    }

    #[test]
    fn test_empty_seeds_yield_empty_result() {
        let recommender = recommender_with(vec![(1, vec![1.0, 0.0])]);
        assert!(recommender.recommend(&[], 10, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_seeds_yield_empty_result() {
        let recommender = recommender_with(vec![(1, vec![1.0, 0.0])]);
        assert!(recommender.recommend(&[99], 10, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_index_unavailable() {
        let recommender = AnnRecommender::new(Arc::new(UnreachableStore), 5);
        assert!(matches!(
            recommender.recommend(&[1], 10, &[]),
            Err(RecommendError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_nearest_unseen_song_ranked_first() {
        // Catalog of 4 songs; seeding with song 1 must surface song 4
        // (cosine ~0.994) ahead of the orthogonal song 2.
        let recommender = recommender_with(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.0, 1.0]),
            (3, vec![1.0, 0.0]),
            (4, vec![0.9, 0.1]),
        ]);

        let result = recommender.recommend(&[1], 10, &[1, 3]).unwrap();
        assert_eq!(result, vec![4, 2]);
    }

    #[test]
    fn test_excluded_ids_never_returned() {
        let recommender = recommender_with(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.9, 0.1]),
            (3, vec![0.8, 0.2]),
            (4, vec![0.0, 1.0]),
        ]);

        let seeds = vec![1, 2];
        let result = recommender.recommend_unseen(&seeds, 10).unwrap();
        for seed in &seeds {
            assert!(!result.contains(seed));
        }
        assert_eq!(result, vec![3, 4]);
    }

    #[test]
    fn test_fewer_than_top_n_returned_without_error() {
        let recommender = recommender_with(vec![(1, vec![1.0, 0.0]), (2, vec![0.9, 0.1])]);
        let result = recommender.recommend(&[1], 10, &[1]).unwrap();
        assert_eq!(result, vec![2]);
    }

    #[test]
    fn test_multi_seed_query_averages_vectors() {
        let recommender = recommender_with(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.0, 1.0]),
            (3, vec![0.7, 0.7]),
            (4, vec![-1.0, 0.0]),
        ]);

        // The mean of seeds 1 and 2 points along [0.5, 0.5]; song 3 matches.
        let result = recommender.recommend(&[1, 2], 1, &[1, 2]).unwrap();
        assert_eq!(result, vec![3]);
    }

    #[test]
    fn test_replace_swaps_results_wholesale() {
        let recommender = recommender_with(vec![(1, vec![1.0, 0.0]), (2, vec![0.9, 0.1])]);
        assert_eq!(recommender.recommend(&[1], 1, &[1]).unwrap(), vec![2]);

        let rebuilt = IndexSnapshot::build(
            &[
                FusedVector {
                    song_id: 1,
                    vector: vec![1.0, 0.0],
                },
                FusedVector {
                    song_id: 5,
                    vector: vec![0.95, 0.05],
                },
            ],
            None,
            1,
        )
        .unwrap();
        recommender.index_handle().replace(rebuilt);

        assert_eq!(recommender.recommend(&[1], 1, &[1]).unwrap(), vec![5]);
    }
}
