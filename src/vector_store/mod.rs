//! Vector and index snapshot storage.
//!
//! One row per song holds its content, cf and hybrid vectors (JSON columns)
//! together with the universe epoch they were computed from. The index
//! snapshot is a separate file artifact written atomically so a failed
//! build never clobbers the previous valid one.

mod models;
mod schema;
mod snapshot;
mod store;
mod trait_def;

pub use models::{StoredVector, VectorKind};
pub use store::SqliteVectorStore;
pub use trait_def::VectorStore;
