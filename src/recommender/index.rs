//! Exact inner-product index over normalized hybrid vectors.
//!
//! Vectors are L2-normalized at insertion so cosine similarity is realized
//! as a plain inner product. Search is brute force over the flat vector
//! block, parallelized with rayon; exactness is preferred over scale here.
//! The position -> song id mapping is the insertion order itself, so index
//! and mapping can never drift apart.

use super::error::RecommendError;
use super::hybrid::FusedVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A single immutable build of the index: dimension, insertion-ordered
/// normalized vectors and the parallel song id mapping, stamped with the
/// universe epoch the vectors were computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    dimension: usize,
    song_ids: Vec<i64>,
    vectors: Vec<f32>,
    pub universe_epoch: Option<i64>,
    pub built_at: i64,
    #[serde(skip)]
    positions: HashMap<i64, usize>,
}

/// One search result: a song and its inner-product similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub song_id: i64,
    pub score: f32,
}

impl IndexSnapshot {
    /// Build a snapshot from fused vectors.
    ///
    /// All vectors must share one dimension; zero-norm vectors are dropped
    /// with a warning rather than inserted as degenerate points.
    pub fn build(
        entries: &[FusedVector],
        universe_epoch: Option<i64>,
        built_at: i64,
    ) -> Result<Self, RecommendError> {
        let dimension = entries
            .iter()
            .map(|e| e.vector.len())
            .find(|&len| len > 0)
            .unwrap_or(0);

        let mut song_ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len() * dimension);

        for entry in entries {
            if entry.vector.len() != dimension {
                return Err(RecommendError::DimensionMismatch(format!(
                    "hybrid vector for song {} has {} dims, expected {}",
                    entry.song_id,
                    entry.vector.len(),
                    dimension
                )));
            }

            let mut vector = entry.vector.clone();
            if !l2_normalize(&mut vector) {
                warn!(
                    "Hybrid vector for song {} has zero norm, excluding from index",
                    entry.song_id
                );
                continue;
            }

            song_ids.push(entry.song_id);
            vectors.extend_from_slice(&vector);
        }

        let mut snapshot = Self {
            dimension,
            song_ids,
            vectors,
            universe_epoch,
            built_at,
            positions: HashMap::new(),
        };
        snapshot.rebuild_positions();
        Ok(snapshot)
    }

    /// Rebuild the song id -> position lookup. Must be called after
    /// deserializing a snapshot (the map is derived state and not
    /// serialized).
    pub fn rebuild_positions(&mut self) {
        self.positions = self
            .song_ids
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.song_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.song_ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Position -> song id mapping, in insertion order.
    pub fn song_ids(&self) -> &[i64] {
        &self.song_ids
    }

    /// The normalized vector stored for a song, if the song is indexed.
    pub fn vector_for(&self, song_id: i64) -> Option<&[f32]> {
        let pos = *self.positions.get(&song_id)?;
        Some(&self.vectors[pos * self.dimension..(pos + 1) * self.dimension])
    }

    /// Exact top-k search by descending inner product, ties broken by
    /// ascending song id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RecommendError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RecommendError::DimensionMismatch(format!(
                "query vector has {} dims, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .par_chunks(self.dimension)
            .zip(self.song_ids.par_iter())
            .map(|(vector, &song_id)| SearchHit {
                song_id,
                score: vector.iter().zip(query.iter()).map(|(a, b)| a * b).sum(),
            })
            .collect();

        hits.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.song_id.cmp(&b.song_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Normalize in place; returns false (leaving the vector untouched) when the
/// norm is zero.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return false;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    true
}
