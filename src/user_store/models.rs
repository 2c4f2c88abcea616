use serde::{Deserialize, Serialize};

/// A positive implicit-feedback event: a user liked a song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongLike {
    pub user_id: i64,
    pub song_id: i64,
    pub created_at: i64,
}
