use serde::{Deserialize, Serialize};

/// Which of a song's three vectors a storage operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    Content,
    Cf,
    Hybrid,
}

impl VectorKind {
    /// Column holding this vector in the song_vectors table.
    pub(super) fn column(&self) -> &'static str {
        match self {
            VectorKind::Content => "content_vector",
            VectorKind::Cf => "cf_vector",
            VectorKind::Hybrid => "hybrid_vector",
        }
    }
}

impl std::fmt::Display for VectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorKind::Content => write!(f, "content"),
            VectorKind::Cf => write!(f, "cf"),
            VectorKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// A vector as loaded from storage.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredVector {
    pub song_id: i64,
    pub kind: VectorKind,
    pub values: Vec<f32>,
    /// Universe epoch the vector was computed from; None for cf vectors,
    /// which do not depend on the content universe.
    pub universe_epoch: Option<i64>,
    pub updated_at: i64,
}
