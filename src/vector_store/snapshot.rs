//! Index snapshot file persistence.
//!
//! Snapshots are serialized to JSON and written through a temp file in the
//! target directory followed by an atomic rename, so readers either see the
//! previous complete artifact or the new one, never a partial write.

use crate::recommender::IndexSnapshot;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

pub(super) fn save_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_vec(snapshot).context("Failed to serialize index snapshot")?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    tmp.write_all(&json)
        .context("Failed to write index snapshot")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace index snapshot at {:?}", path))?;

    info!(
        "Persisted index snapshot ({} songs, dimension {}) to {:?}",
        snapshot.len(),
        snapshot.dimension(),
        path
    );
    Ok(())
}

pub(super) fn load_snapshot(path: &Path) -> Result<Option<IndexSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index snapshot at {:?}", path))?;
    let mut snapshot: IndexSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("Index snapshot at {:?} is corrupt", path))?;
    snapshot.rebuild_positions();
    Ok(Some(snapshot))
}
