//! Dense matrix scorer, the index-free recommendation path.
//!
//! Scores every song for one user directly from dense feature and rating
//! matrices. O(songs x rated_songs) per call, acceptable only for small
//! catalogs; it exists independently of the index so batch scoring keeps
//! working when no snapshot is available.

use super::error::RecommendError;
use crate::catalog_store::CatalogStore;
use crate::user_store::UserStore;
use crate::vector_store::{VectorKind, VectorStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use super::retrieval::Recommender;

/// Row-major dense matrix with id-labeled rows and columns.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    row_ids: Vec<i64>,
    col_ids: Vec<i64>,
    values: Vec<f32>,
}

impl DenseMatrix {
    pub fn new(row_ids: Vec<i64>, col_ids: Vec<i64>, values: Vec<f32>) -> Result<Self, RecommendError> {
        if values.len() != row_ids.len() * col_ids.len() {
            return Err(RecommendError::DimensionMismatch(format!(
                "{} values for a {}x{} matrix",
                values.len(),
                row_ids.len(),
                col_ids.len()
            )));
        }
        Ok(Self {
            row_ids,
            col_ids,
            values,
        })
    }

    pub fn from_rows(
        row_ids: Vec<i64>,
        col_ids: Vec<i64>,
        rows: Vec<Vec<f32>>,
    ) -> Result<Self, RecommendError> {
        let n_cols = col_ids.len();
        for (row_id, row) in row_ids.iter().zip(rows.iter()) {
            if row.len() != n_cols {
                return Err(RecommendError::DimensionMismatch(format!(
                    "row {} has {} values, expected {}",
                    row_id,
                    row.len(),
                    n_cols
                )));
            }
        }
        let values = rows.into_iter().flatten().collect();
        Self::new(row_ids, col_ids, values)
    }

    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_ids.len()
    }

    pub fn row_ids(&self) -> &[i64] {
        &self.row_ids
    }

    pub fn col_ids(&self) -> &[i64] {
        &self.col_ids
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let n = self.col_ids.len();
        &self.values[index * n..(index + 1) * n]
    }

    pub fn row_by_id(&self, row_id: i64) -> Option<&[f32]> {
        let index = self.row_ids.iter().position(|&id| id == row_id)?;
        Some(self.row(index))
    }

    /// Materialize a column (used for item-item similarity over the
    /// transposed ratings matrix).
    pub fn column(&self, index: usize) -> Vec<f32> {
        let n = self.col_ids.len();
        (0..self.row_ids.len())
            .map(|r| self.values[r * n + index])
            .collect()
    }
}

/// Per-song hybrid scores for one user, ordered by descending score with
/// ascending song id as the stable tie-break.
#[derive(Debug, Clone)]
pub struct DenseScores {
    pub scores: Vec<(i64, f32)>,
    /// True when the user had no positive ratings: both score components
    /// are all zero and the ranking carries no signal.
    pub degraded: bool,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score every song of the ratings matrix for `user_id`.
///
/// `alpha` in [0, 1] weights content similarity against the collaborative
/// score (`alpha = 1` is pure content, `alpha = 0` pure collaborative).
/// Content rows are looked up by song id in `content_features`; songs
/// without a row contribute zero similarity.
pub fn score_all(
    user_id: i64,
    content_features: &DenseMatrix,
    ratings_matrix: &DenseMatrix,
    alpha: f32,
) -> Result<DenseScores, RecommendError> {
    let alpha = if (0.0..=1.0).contains(&alpha) {
        alpha
    } else {
        let clamped = alpha.clamp(0.0, 1.0);
        warn!("alpha {} outside [0, 1], clamping to {}", alpha, clamped);
        clamped
    };

    let user_ratings = ratings_matrix
        .row_by_id(user_id)
        .ok_or(RecommendError::EmptyInput("user has no ratings row"))?;

    // Songs the user rated positively drive both score components.
    let rated: Vec<usize> = user_ratings
        .iter()
        .enumerate()
        .filter(|(_, &r)| r > 0.0)
        .map(|(j, _)| j)
        .collect();
    let degraded = rated.is_empty();

    let song_ids = ratings_matrix.col_ids();
    let rated_columns: Vec<Vec<f32>> = rated.iter().map(|&j| ratings_matrix.column(j)).collect();
    let rated_content: Vec<Option<&[f32]>> = rated
        .iter()
        .map(|&j| content_features.row_by_id(song_ids[j]))
        .collect();

    let empty: &[f32] = &[];
    let mut scores = Vec::with_capacity(song_ids.len());
    for (j, &song_id) in song_ids.iter().enumerate() {
        let (content_score, collaborative_score) = if degraded {
            (0.0, 0.0)
        } else {
            // Mean cosine similarity to the rated songs' content rows.
            let song_content = content_features.row_by_id(song_id).unwrap_or(empty);
            let content_sum: f32 = rated_content
                .iter()
                .map(|rated_row| cosine(song_content, rated_row.unwrap_or(empty)))
                .sum();
            let content_score = content_sum / rated.len() as f32;

            // Item-item similarity-weighted average of the user's ratings.
            let song_column = ratings_matrix.column(j);
            let mut numerator = 0.0f32;
            let mut denominator = 0.0f32;
            for (&r, rated_column) in rated.iter().zip(rated_columns.iter()) {
                let similarity = cosine(&song_column, rated_column);
                numerator += similarity * user_ratings[r];
                denominator += similarity.abs();
            }
            let collaborative_score = if denominator != 0.0 {
                numerator / denominator
            } else {
                0.0
            };

            (content_score, collaborative_score)
        };

        scores.push((
            song_id,
            alpha * content_score + (1.0 - alpha) * collaborative_score,
        ));
    }

    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(DenseScores { scores, degraded })
}

/// Dense-matrix variant of the [`Recommender`] capability: the seed set is
/// treated as the positive ratings of a synthetic user appended to the
/// current like matrix, then scored with [`score_all`].
pub struct DenseRecommender {
    catalog_store: Arc<dyn CatalogStore>,
    user_store: Arc<dyn UserStore>,
    vector_store: Arc<dyn VectorStore>,
    alpha: f32,
}

impl DenseRecommender {
    pub fn new(
        catalog_store: Arc<dyn CatalogStore>,
        user_store: Arc<dyn UserStore>,
        vector_store: Arc<dyn VectorStore>,
        alpha: f32,
    ) -> Self {
        Self {
            catalog_store,
            user_store,
            vector_store,
            alpha,
        }
    }
}

/// Assemble the dense content-feature matrix (rows = songs) from stored
/// content vectors. Songs without a stored vector get a zero row.
pub fn content_matrix_from_store(
    song_ids: &[i64],
    vector_store: &dyn VectorStore,
) -> Result<DenseMatrix, RecommendError> {
    let stored = vector_store.load_all_vectors(VectorKind::Content)?;
    let by_song: HashMap<i64, Vec<f32>> = stored
        .into_iter()
        .map(|v| (v.song_id, v.values))
        .collect();
    let dimension = by_song.values().map(|v| v.len()).max().unwrap_or(0);

    let rows: Vec<Vec<f32>> = song_ids
        .iter()
        .map(|id| match by_song.get(id) {
            Some(v) if v.len() == dimension => v.clone(),
            _ => vec![0.0; dimension],
        })
        .collect();
    let feature_ids: Vec<i64> = (0..dimension as i64).collect();
    DenseMatrix::from_rows(song_ids.to_vec(), feature_ids, rows)
}

/// Assemble the binary ratings matrix (rows = users, columns = songs) from
/// the like store, optionally appending a synthetic user with the given
/// liked songs.
pub fn ratings_matrix_from_store(
    song_ids: &[i64],
    user_store: &dyn UserStore,
    synthetic_user: Option<(i64, &[i64])>,
) -> Result<DenseMatrix, RecommendError> {
    let mut user_ids = user_store.list_user_ids()?;
    let likes = user_store.list_likes()?;

    let col_index: HashMap<i64, usize> = song_ids
        .iter()
        .enumerate()
        .map(|(j, id)| (*id, j))
        .collect();

    let mut rows: Vec<Vec<f32>> = vec![vec![0.0; song_ids.len()]; user_ids.len()];
    let row_index: HashMap<i64, usize> = user_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    for like in &likes {
        if let (Some(&i), Some(&j)) = (row_index.get(&like.user_id), col_index.get(&like.song_id))
        {
            rows[i][j] = 1.0;
        }
    }

    if let Some((synthetic_id, liked)) = synthetic_user {
        let mut row = vec![0.0; song_ids.len()];
        for song_id in liked {
            if let Some(&j) = col_index.get(song_id) {
                row[j] = 1.0;
            }
        }
        user_ids.push(synthetic_id);
        rows.push(row);
    }

    DenseMatrix::from_rows(user_ids, song_ids.to_vec(), rows)
}

impl Recommender for DenseRecommender {
    fn recommend(
        &self,
        seed_song_ids: &[i64],
        top_n: usize,
        exclude: &[i64],
    ) -> Result<Vec<i64>, RecommendError> {
        if seed_song_ids.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let songs = self.catalog_store.list_songs()?;
        if songs.is_empty() {
            return Ok(Vec::new());
        }
        let song_ids: Vec<i64> = songs.iter().map(|s| s.id).collect();

        let synthetic_id = self.user_store.list_user_ids()?.iter().max().unwrap_or(&0) + 1;
        let content = content_matrix_from_store(&song_ids, self.vector_store.as_ref())?;
        let ratings =
            ratings_matrix_from_store(&song_ids, self.user_store.as_ref(), Some((synthetic_id, seed_song_ids)))?;

        let result = score_all(synthetic_id, &content, &ratings, self.alpha)?;
        if result.degraded {
            // No seed matched a cataloged song: the ranking is all zeros.
            return Ok(Vec::new());
        }

        let excluded: HashSet<i64> = exclude.iter().copied().collect();
        Ok(result
            .scores
            .into_iter()
            .filter(|(id, _)| !excluded.contains(id))
            .map(|(id, _)| id)
            .take(top_n)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3 songs x 2 features, the same fixture shape the scorer is used with.
    fn content_fixture() -> DenseMatrix {
        DenseMatrix::from_rows(
            vec![1, 2, 3],
            vec![10, 11],
            vec![
                vec![0.8, 0.1],
                vec![0.4, 0.7],
                vec![0.9, 0.2],
            ],
        )
        .unwrap()
    }

    /// 3 users x 3 songs.
    fn ratings_fixture() -> DenseMatrix {
        DenseMatrix::from_rows(
            vec![101, 102, 103],
            vec![1, 2, 3],
            vec![
                vec![5.0, 0.0, 2.0],
                vec![0.0, 4.0, 0.0],
                vec![3.0, 0.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_scores_cover_every_song_sorted_descending() {
        let result = score_all(101, &content_fixture(), &ratings_fixture(), 0.5).unwrap();

        assert_eq!(result.scores.len(), 3);
        assert!(!result.degraded);
        for window in result.scores.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
    }

    #[test]
    fn test_alpha_one_is_pure_content_ranking() {
        let content = content_fixture();
        let ratings = ratings_fixture();
        let result = score_all(101, &content, &ratings, 1.0).unwrap();

        // Recompute the content component by hand for song 2: mean cosine
        // to the user's positively rated songs 1 and 3.
        let expected = (cosine(content.row(1), content.row(0))
            + cosine(content.row(1), content.row(2)))
            / 2.0;
        let song2_score = result.scores.iter().find(|(id, _)| *id == 2).unwrap().1;
        assert!((song2_score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_zero_is_pure_collaborative_ranking() {
        let ratings = ratings_fixture();
        let result = score_all(101, &content_fixture(), &ratings, 0.0).unwrap();

        // Song 1's collaborative score: weighted by similarity of song 1's
        // rating column to the rated songs' columns (songs 1 and 3).
        let col1 = ratings.column(0);
        let col3 = ratings.column(2);
        let s11 = cosine(&col1, &col1);
        let s13 = cosine(&col1, &col3);
        let expected = (s11 * 5.0 + s13 * 2.0) / (s11.abs() + s13.abs());
        let song1_score = result.scores.iter().find(|(id, _)| *id == 1).unwrap().1;
        assert!((song1_score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_blend_is_linear_in_alpha() {
        let content = content_fixture();
        let ratings = ratings_fixture();

        let pure_content = score_all(101, &content, &ratings, 1.0).unwrap();
        let pure_collab = score_all(101, &content, &ratings, 0.0).unwrap();
        let blended = score_all(101, &content, &ratings, 0.3).unwrap();

        for (id, score) in &blended.scores {
            let c = pure_content.scores.iter().find(|(i, _)| i == id).unwrap().1;
            let k = pure_collab.scores.iter().find(|(i, _)| i == id).unwrap().1;
            assert!((score - (0.3 * c + 0.7 * k)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_user_without_positive_ratings_is_degraded_all_zero() {
        let content = content_fixture();
        let ratings = DenseMatrix::from_rows(
            vec![101, 102],
            vec![1, 2, 3],
            vec![vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 1.0]],
        )
        .unwrap();

        let result = score_all(101, &content, &ratings, 0.5).unwrap();
        assert!(result.degraded);
        assert!(result.scores.iter().all(|(_, s)| *s == 0.0));
        // All-zero scores tie; order falls back to ascending song id.
        let ids: Vec<i64> = result.scores.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_user_is_an_error() {
        let result = score_all(999, &content_fixture(), &ratings_fixture(), 0.5);
        assert!(matches!(result, Err(RecommendError::EmptyInput(_))));
    }

    #[test]
    fn test_songs_without_content_rows_score_zero_content() {
        // Content matrix only covers song 1.
        let content =
            DenseMatrix::from_rows(vec![1], vec![10, 11], vec![vec![0.8, 0.1]]).unwrap();
        let result = score_all(101, &content, &ratings_fixture(), 1.0).unwrap();

        let song2_score = result.scores.iter().find(|(id, _)| *id == 2).unwrap().1;
        assert_eq!(song2_score, 0.0);
    }

    #[test]
    fn test_matrix_shape_validation() {
        assert!(DenseMatrix::new(vec![1, 2], vec![1, 2, 3], vec![0.0; 5]).is_err());
        assert!(DenseMatrix::from_rows(vec![1], vec![1, 2], vec![vec![0.0; 3]]).is_err());
    }
}
