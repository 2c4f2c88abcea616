//! Test fixture creation: throwaway SQLite stores and a small catalog with
//! two songs per artist/genre pair, so content similarity has exact ties to
//! assert against.

#![allow(dead_code)]

use anyhow::Result;
use melisma_recommender::background_jobs::{jobs, BackgroundJob, JobContext};
use melisma_recommender::catalog_store::{CatalogStore, SqliteCatalogStore};
use melisma_recommender::config::RecommenderSettings;
use melisma_recommender::user_store::{SqliteUserStore, UserStore};
use melisma_recommender::vector_store::SqliteVectorStore;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub struct TestStores {
    // Held so the databases outlive the stores.
    _dir: TempDir,
    pub catalog: Arc<SqliteCatalogStore>,
    pub users: Arc<SqliteUserStore>,
    pub vectors: Arc<SqliteVectorStore>,
    pub snapshot_path: std::path::PathBuf,
    pub settings: RecommenderSettings,
}

pub fn create_test_stores() -> Result<TestStores> {
    let dir = TempDir::new()?;
    let snapshot_path = dir.path().join("song_index.json");
    let catalog = Arc::new(SqliteCatalogStore::new(dir.path().join("catalog.db"))?);
    let users = Arc::new(SqliteUserStore::new(dir.path().join("users.db"))?);
    let vectors = Arc::new(SqliteVectorStore::new(
        dir.path().join("vectors.db"),
        snapshot_path.clone(),
    )?);

    Ok(TestStores {
        _dir: dir,
        catalog,
        users,
        vectors,
        snapshot_path,
        settings: RecommenderSettings {
            factors: 16,
            ..RecommenderSettings::default()
        },
    })
}

/// Eight songs, two per (artist, genre) pair, ids in insertion order.
pub fn seed_catalog(catalog: &dyn CatalogStore) -> Result<Vec<i64>> {
    let songs = [
        ("Do I Wanna Know?", "Arctic Monkeys", "Rock"),
        ("R U Mine?", "Arctic Monkeys", "Rock"),
        ("Bad Guy", "Billie Eilish", "Pop"),
        ("Bury a Friend", "Billie Eilish", "Pop"),
        ("Moanin'", "Charles Mingus", "Jazz"),
        ("Fables of Faubus", "Charles Mingus", "Jazz"),
        ("Around the World", "Daft Punk", "Electronic"),
        ("One More Time", "Daft Punk", "Electronic"),
    ];

    let mut ids = Vec::with_capacity(songs.len());
    for (title, artist, genre) in songs {
        ids.push(catalog.add_song(title, artist, genre)?);
    }
    Ok(ids)
}

/// Four users with overlapping genre tastes.
pub fn seed_likes(users: &dyn UserStore, song_ids: &[i64]) -> Result<Vec<i64>> {
    let handles = ["alice", "bob", "carol", "dave"];
    let mut user_ids = Vec::with_capacity(handles.len());
    for handle in handles {
        user_ids.push(users.create_user(handle)?);
    }

    // alice: rock + electronic, bob: rock, carol: pop, dave: jazz + pop
    let likes: [(usize, &[usize]); 4] = [
        (0, &[0, 1, 6, 7]),
        (1, &[0, 1]),
        (2, &[2, 3]),
        (3, &[4, 5, 2]),
    ];
    for (user_idx, songs) in likes {
        for &song_idx in songs {
            users.set_song_liked(user_ids[user_idx], song_ids[song_idx], true)?;
        }
    }
    Ok(user_ids)
}

pub fn job_context(stores: &TestStores) -> JobContext {
    JobContext::new(
        CancellationToken::new(),
        stores.catalog.clone(),
        stores.users.clone(),
        stores.vectors.clone(),
        stores.settings.clone(),
    )
}

/// Execute jobs synchronously in order, stopping at the first failure.
pub fn run_jobs_sync(jobs: Vec<Arc<dyn BackgroundJob>>, ctx: &JobContext) -> Result<()> {
    for job in jobs {
        job.execute(ctx)
            .map_err(|e| anyhow::anyhow!("job {} failed: {}", job.id(), e))?;
    }
    Ok(())
}

/// Run the whole offline pipeline.
pub fn run_pipeline(ctx: &JobContext) -> Result<()> {
    run_jobs_sync(jobs::pipeline_jobs(), ctx)
}
