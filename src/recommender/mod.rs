//! The hybrid recommendation core.
//!
//! Offline: likes become a sparse interaction matrix, factorized into
//! collaborative vectors; song attributes become one-hot content vectors;
//! both fuse into hybrid vectors which are normalized and indexed. Online:
//! a seed set of songs is averaged into a query vector and matched against
//! the index, or scored directly through the dense matrix path.

mod content;
mod dense;
mod error;
mod factorization;
mod hybrid;
mod index;
mod interaction_matrix;
mod retrieval;

pub use content::ContentUniverse;
pub use dense::{
    content_matrix_from_store, ratings_matrix_from_store, score_all, DenseMatrix,
    DenseRecommender, DenseScores,
};
pub use error::RecommendError;
pub use factorization::{train_item_factors, CfModel};
pub use hybrid::{fuse, fuse_all, FusedVector, VectorPair};
pub use index::{l2_normalize, IndexSnapshot, SearchHit};
pub use interaction_matrix::InteractionMatrix;
pub use retrieval::{AnnRecommender, IndexHandle, Recommender};
