//! Melisma Recommender Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod catalog_store;
pub mod config;
pub mod recommender;
pub mod sqlite_persistence;
pub mod user_store;
pub mod vector_store;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, Song, SqliteCatalogStore};
pub use recommender::{AnnRecommender, DenseRecommender, RecommendError, Recommender};
pub use user_store::{SqliteUserStore, UserStore};
pub use vector_store::{SqliteVectorStore, VectorKind, VectorStore};
