//! UserStore trait definition.

use super::models::SongLike;
use anyhow::Result;

/// Accessor surface of user and like storage.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait UserStore: Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, handle: &str) -> Result<i64>;

    /// Returns a user's id given the handle.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, handle: &str) -> Result<Option<i64>>;

    /// Returns all user ids, ordered ascending.
    fn list_user_ids(&self) -> Result<Vec<i64>>;

    /// Sets the liked status of a song for a user.
    /// Liking an already-liked song is a no-op (one like per pair).
    fn set_song_liked(&self, user_id: i64, song_id: i64, liked: bool) -> Result<()>;

    /// Returns whether the user liked the song.
    fn is_song_liked(&self, user_id: i64, song_id: i64) -> Result<bool>;

    /// Returns the song ids a user liked, ordered ascending.
    fn get_liked_songs(&self, user_id: i64) -> Result<Vec<i64>>;

    /// Returns every like in the store.
    fn list_likes(&self) -> Result<Vec<SongLike>>;
}
