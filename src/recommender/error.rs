use thiserror::Error;

/// Error taxonomy of the recommendation core.
///
/// Empty-input conditions are handled by returning empty results at the
/// retrieval boundary; the variant exists for callers that need to signal
/// the condition explicitly. Degenerate vectors are excluded from indexing
/// and logged rather than treated as fatal.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("no usable input: {0}")]
    EmptyInput(&'static str),

    #[error("inconsistent vector dimensions: {0}")]
    DimensionMismatch(String),

    #[error("vector for song {0} has zero norm")]
    DegenerateVector(i64),

    #[error("recommendation index unavailable: {0}")]
    IndexUnavailable(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
