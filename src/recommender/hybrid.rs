//! Fusion of content and collaborative vectors.
//!
//! Pure and re-runnable: given the vectors as of a point in time the output
//! is fully determined. Mixing vectors from different universe epochs is
//! rejected up front instead of producing silently wrong concatenations.

use super::error::RecommendError;
use tracing::warn;

/// The per-song inputs to fusion, as loaded from vector storage.
#[derive(Debug, Clone)]
pub struct VectorPair {
    pub song_id: i64,
    pub cf: Option<Vec<f32>>,
    pub content: Option<Vec<f32>>,
    pub universe_epoch: Option<i64>,
}

/// A song's fused hybrid vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedVector {
    pub song_id: i64,
    pub vector: Vec<f32>,
}

/// Fuse one song's vectors: cf ++ content, falling back to whichever side is
/// present. Returns None when both sides are absent or empty.
pub fn fuse(cf: Option<&[f32]>, content: Option<&[f32]>) -> Option<Vec<f32>> {
    let cf = cf.filter(|v| !v.is_empty());
    let content = content.filter(|v| !v.is_empty());

    match (cf, content) {
        (Some(cf), Some(content)) => {
            let mut hybrid = Vec::with_capacity(cf.len() + content.len());
            hybrid.extend_from_slice(cf);
            hybrid.extend_from_slice(content);
            Some(hybrid)
        }
        (Some(cf), None) => Some(cf.to_vec()),
        (None, Some(content)) => Some(content.to_vec()),
        (None, None) => None,
    }
}

/// Fuse a batch of songs after validating that the inputs are mutually
/// consistent: all content vectors must come from the same universe epoch
/// and share one length, and all cf vectors must share one length.
///
/// Songs with neither vector are skipped with a warning; they cannot be
/// indexed.
pub fn fuse_all(pairs: &[VectorPair]) -> Result<Vec<FusedVector>, RecommendError> {
    let mut content_dims: Option<(usize, Option<i64>)> = None;
    let mut cf_dim: Option<usize> = None;

    for pair in pairs {
        if let Some(content) = pair.content.as_ref().filter(|v| !v.is_empty()) {
            match content_dims {
                None => content_dims = Some((content.len(), pair.universe_epoch)),
                Some((dim, epoch)) => {
                    if dim != content.len() {
                        return Err(RecommendError::DimensionMismatch(format!(
                            "content vector for song {} has {} dims, expected {}",
                            pair.song_id,
                            content.len(),
                            dim
                        )));
                    }
                    if epoch != pair.universe_epoch {
                        return Err(RecommendError::DimensionMismatch(format!(
                            "content vector for song {} is from universe epoch {:?}, expected {:?}",
                            pair.song_id, pair.universe_epoch, epoch
                        )));
                    }
                }
            }
        }
        if let Some(cf) = pair.cf.as_ref().filter(|v| !v.is_empty()) {
            match cf_dim {
                None => cf_dim = Some(cf.len()),
                Some(dim) => {
                    if dim != cf.len() {
                        return Err(RecommendError::DimensionMismatch(format!(
                            "cf vector for song {} has {} dims, expected {}",
                            pair.song_id,
                            cf.len(),
                            dim
                        )));
                    }
                }
            }
        }
    }

    let mut fused = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match fuse(pair.cf.as_deref(), pair.content.as_deref()) {
            Some(vector) => fused.push(FusedVector {
                song_id: pair.song_id,
                vector,
            }),
            None => warn!(
                "Song {} has neither a content nor a cf vector, skipping fusion",
                pair.song_id
            ),
        }
    }
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_concatenates_cf_then_content() {
        let fused = fuse(Some(&[1.0, 2.0]), Some(&[0.0, 1.0, 0.0])).unwrap();
        assert_eq!(fused, vec![1.0, 2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fuse_falls_back_to_content_when_cf_absent() {
        assert_eq!(
            fuse(None, Some(&[0.0, 1.0])).unwrap(),
            vec![0.0, 1.0]
        );
        assert_eq!(
            fuse(Some(&[]), Some(&[0.0, 1.0])).unwrap(),
            vec![0.0, 1.0]
        );
    }

    #[test]
    fn test_fuse_falls_back_to_cf_when_content_absent() {
        assert_eq!(fuse(Some(&[3.0, 4.0]), None).unwrap(), vec![3.0, 4.0]);
        assert_eq!(
            fuse(Some(&[3.0, 4.0]), Some(&[])).unwrap(),
            vec![3.0, 4.0]
        );
    }

    #[test]
    fn test_fuse_nothing_yields_none() {
        assert!(fuse(None, None).is_none());
        assert!(fuse(Some(&[]), Some(&[])).is_none());
    }

    #[test]
    fn test_fuse_all_skips_vectorless_songs() {
        let pairs = vec![
            VectorPair {
                song_id: 1,
                cf: Some(vec![1.0]),
                content: Some(vec![0.0, 1.0]),
                universe_epoch: Some(5),
            },
            VectorPair {
                song_id: 2,
                cf: None,
                content: None,
                universe_epoch: None,
            },
        ];

        let fused = fuse_all(&pairs).unwrap();
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].song_id, 1);
        assert_eq!(fused[0].vector, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fuse_all_rejects_mixed_universe_epochs() {
        let pairs = vec![
            VectorPair {
                song_id: 1,
                cf: None,
                content: Some(vec![0.0, 1.0]),
                universe_epoch: Some(5),
            },
            VectorPair {
                song_id: 2,
                cf: None,
                content: Some(vec![1.0, 0.0]),
                universe_epoch: Some(6),
            },
        ];

        assert!(matches!(
            fuse_all(&pairs),
            Err(RecommendError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_fuse_all_rejects_mismatched_content_lengths() {
        let pairs = vec![
            VectorPair {
                song_id: 1,
                cf: None,
                content: Some(vec![0.0, 1.0]),
                universe_epoch: Some(5),
            },
            VectorPair {
                song_id: 2,
                cf: None,
                content: Some(vec![1.0, 0.0, 0.0]),
                universe_epoch: Some(5),
            },
        ];

        assert!(matches!(
            fuse_all(&pairs),
            Err(RecommendError::DimensionMismatch(_))
        ));
    }
}
