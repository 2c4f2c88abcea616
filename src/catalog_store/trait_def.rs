//! CatalogStore trait definition.

use super::models::Song;
use anyhow::Result;

/// Accessor surface of the song catalog.
///
/// The recommendation pipeline only reads; `add_song` exists for catalog
/// maintenance tooling and test fixtures.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait CatalogStore: Send + Sync {
    /// Add a song to the catalog, returning its assigned id.
    fn add_song(&self, title: &str, artist: &str, genre: &str) -> Result<i64>;

    /// Get a song by id.
    /// Returns Ok(None) if the song does not exist.
    fn get_song(&self, song_id: i64) -> Result<Option<Song>>;

    /// Returns every cataloged song, ordered by ascending id.
    fn list_songs(&self) -> Result<Vec<Song>>;

    /// Resolve a batch of ids to songs; unknown ids are skipped.
    fn songs_by_ids(&self, ids: &[i64]) -> Result<Vec<Song>>;

    /// Number of songs in the catalog.
    fn songs_count(&self) -> Result<usize>;
}
