//! One-hot content vectors over song attributes.
//!
//! The universe is the sorted enumeration of distinct artists and genres
//! observed at generation time. Vector length is |artists| + |genres|, and
//! every vector is only meaningful relative to the universe epoch it was
//! encoded under.

use crate::catalog_store::Song;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The fixed enumeration of attribute values one-hot slots are assigned
/// from. Regenerating the universe changes vector dimensionality, so an
/// epoch stamp travels with it and with every vector derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUniverse {
    pub artists: Vec<String>,
    pub genres: Vec<String>,
    pub epoch: i64,
}

impl ContentUniverse {
    /// Build the universe from the current catalog: sorted distinct artists,
    /// sorted distinct genres.
    pub fn from_songs(songs: &[Song], epoch: i64) -> Self {
        let mut artists: Vec<String> = songs.iter().map(|s| s.artist.clone()).collect();
        artists.sort_unstable();
        artists.dedup();
        let mut genres: Vec<String> = songs.iter().map(|s| s.genre.clone()).collect();
        genres.sort_unstable();
        genres.dedup();

        Self {
            artists,
            genres,
            epoch,
        }
    }

    /// One-hot vector length for this universe.
    pub fn dimension(&self) -> usize {
        self.artists.len() + self.genres.len()
    }

    /// Encode a song against this universe.
    ///
    /// A song whose artist or genre is not in the universe (stale snapshot)
    /// gets zeros in the affected block; callers are expected to rebuild the
    /// universe when the catalog changes.
    pub fn encode(&self, song: &Song) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension()];

        match self.artists.binary_search(&song.artist) {
            Ok(slot) => vector[slot] = 1.0,
            Err(_) => warn!(
                "Artist {:?} of song {} not in content universe (epoch {})",
                song.artist, song.id, self.epoch
            ),
        }
        match self.genres.binary_search(&song.genre) {
            Ok(slot) => vector[self.artists.len() + slot] = 1.0,
            Err(_) => warn!(
                "Genre {:?} of song {} not in content universe (epoch {})",
                song.genre, song.id, self.epoch
            ),
        }

        vector
    }
}
