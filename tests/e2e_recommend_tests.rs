//! End-to-end tests for the retrieval paths: the indexed recommender over a
//! hand-written vector catalog, and the dense matrix fallback.

mod common;

use common::fixtures::{create_test_stores, job_context, run_jobs_sync, seed_catalog, seed_likes};
use melisma_recommender::background_jobs::jobs::{BuildIndexJob, ContentVectorsJob};
use melisma_recommender::recommender::{
    AnnRecommender, DenseRecommender, RecommendError, Recommender,
};
use melisma_recommender::vector_store::{VectorKind, VectorStore};
use std::sync::Arc;

/// The four-song scenario: seeds [1,0]; song 4 at [0.9,0.1] (cosine ~0.994)
/// must beat the orthogonal song 2, and song 3 duplicates the seed vector.
fn store_scenario_vectors(vectors: &dyn VectorStore) {
    vectors
        .save_vector(1, VectorKind::Hybrid, &[1.0, 0.0], Some(1))
        .unwrap();
    vectors
        .save_vector(2, VectorKind::Hybrid, &[0.0, 1.0], Some(1))
        .unwrap();
    vectors
        .save_vector(3, VectorKind::Hybrid, &[1.0, 0.0], Some(1))
        .unwrap();
    vectors
        .save_vector(4, VectorKind::Hybrid, &[0.9, 0.1], Some(1))
        .unwrap();
}

#[test]
fn test_seed_scenario_ranks_near_neighbor_over_orthogonal() {
    let stores = create_test_stores().unwrap();
    store_scenario_vectors(stores.vectors.as_ref());
    run_jobs_sync(vec![Arc::new(BuildIndexJob)], &job_context(&stores)).unwrap();

    let recommender = AnnRecommender::new(stores.vectors.clone(), 5);

    // Excluding only the seed: the identical-vector song 3 ties at 1.0 and
    // comes first, then song 4, then song 2.
    let result = recommender.recommend(&[1], 10, &[1]).unwrap();
    assert_eq!(result, vec![3, 4, 2]);

    // Excluding song 3 as well: song 4 wins.
    let result = recommender.recommend(&[1], 10, &[1, 3]).unwrap();
    assert_eq!(result, vec![4, 2]);
}

#[test]
fn test_missing_snapshot_surfaces_index_unavailable() {
    let stores = create_test_stores().unwrap();
    let recommender = AnnRecommender::new(stores.vectors.clone(), 5);

    assert!(matches!(
        recommender.recommend(&[1], 10, &[]),
        Err(RecommendError::IndexUnavailable(_))
    ));
}

#[test]
fn test_corrupt_snapshot_surfaces_index_unavailable() {
    let stores = create_test_stores().unwrap();
    store_scenario_vectors(stores.vectors.as_ref());
    run_jobs_sync(vec![Arc::new(BuildIndexJob)], &job_context(&stores)).unwrap();

    // Overwrite the artifact with garbage; a fresh recommender must refuse
    // to serve from it.
    std::fs::write(&stores.snapshot_path, "not a snapshot").unwrap();

    let recommender = AnnRecommender::new(stores.vectors.clone(), 5);
    assert!(matches!(
        recommender.recommend(&[1], 10, &[]),
        Err(RecommendError::IndexUnavailable(_))
    ));
}

#[test]
fn test_empty_seed_set_is_empty_result_not_error() {
    let stores = create_test_stores().unwrap();
    store_scenario_vectors(stores.vectors.as_ref());
    run_jobs_sync(vec![Arc::new(BuildIndexJob)], &job_context(&stores)).unwrap();

    let recommender = AnnRecommender::new(stores.vectors.clone(), 5);
    assert!(recommender.recommend(&[], 10, &[]).unwrap().is_empty());
}

#[test]
fn test_dense_recommender_matches_content_expectation() {
    let stores = create_test_stores().unwrap();
    let song_ids = seed_catalog(stores.catalog.as_ref()).unwrap();
    seed_likes(stores.users.as_ref(), &song_ids).unwrap();
    // Only content vectors are needed for a pure-content dense ranking.
    run_jobs_sync(vec![Arc::new(ContentVectorsJob)], &job_context(&stores)).unwrap();

    let recommender = DenseRecommender::new(
        stores.catalog.clone(),
        stores.users.clone(),
        stores.vectors.clone(),
        1.0,
    );

    let result = recommender.recommend_unseen(&[song_ids[0]], 3).unwrap();
    // Song 1's content twin ranks first.
    assert_eq!(result[0], song_ids[1]);
    assert!(!result.contains(&song_ids[0]));
}

#[test]
fn test_dense_recommender_with_unknown_seeds_is_empty() {
    let stores = create_test_stores().unwrap();
    let song_ids = seed_catalog(stores.catalog.as_ref()).unwrap();
    seed_likes(stores.users.as_ref(), &song_ids).unwrap();
    run_jobs_sync(vec![Arc::new(ContentVectorsJob)], &job_context(&stores)).unwrap();

    let recommender = DenseRecommender::new(
        stores.catalog.clone(),
        stores.users.clone(),
        stores.vectors.clone(),
        0.5,
    );

    // Seeds that match no cataloged song leave the synthetic user without
    // positive ratings: degraded mode, empty result.
    assert!(recommender.recommend_unseen(&[424242], 5).unwrap().is_empty());
}

#[test]
fn test_both_strategies_agree_on_the_obvious_twin() {
    let stores = create_test_stores().unwrap();
    let song_ids = seed_catalog(stores.catalog.as_ref()).unwrap();
    seed_likes(stores.users.as_ref(), &song_ids).unwrap();
    common::fixtures::run_pipeline(&job_context(&stores)).unwrap();

    let ann = AnnRecommender::new(stores.vectors.clone(), 5);
    let dense = DenseRecommender::new(
        stores.catalog.clone(),
        stores.users.clone(),
        stores.vectors.clone(),
        1.0,
    );

    let ann_top = ann.recommend_unseen(&[song_ids[6]], 1).unwrap();
    let dense_top = dense.recommend_unseen(&[song_ids[6]], 1).unwrap();
    assert_eq!(ann_top, dense_top);
    assert_eq!(ann_top, vec![song_ids[7]]);
}
