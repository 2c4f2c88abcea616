use super::models::SongLike;
use super::schema::USER_VERSIONED_SCHEMAS;
use super::trait_def::UserStore;
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_database(db_path.as_ref(), USER_VERSIONED_SCHEMAS, "user")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, handle: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO users (handle) VALUES (?1)", params![handle])
            .context("Failed to create user")?;
        Ok(conn.last_insert_rowid())
    }

    fn get_user_id(&self, handle: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id FROM users WHERE handle = ?1",
            params![handle],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query user")
    }

    fn list_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list users")?;
        Ok(ids)
    }

    fn set_song_liked(&self, user_id: i64, song_id: i64, liked: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if liked {
            conn.execute(
                "INSERT OR IGNORE INTO song_likes (user_id, song_id) VALUES (?1, ?2)",
                params![user_id, song_id],
            )
            .context("Failed to insert like")?;
        } else {
            conn.execute(
                "DELETE FROM song_likes WHERE user_id = ?1 AND song_id = ?2",
                params![user_id, song_id],
            )
            .context("Failed to delete like")?;
        }
        Ok(())
    }

    fn is_song_liked(&self, user_id: i64, song_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let liked = conn
            .query_row(
                "SELECT 1 FROM song_likes WHERE user_id = ?1 AND song_id = ?2",
                params![user_id, song_id],
                |_| Ok(true),
            )
            .optional()
            .context("Failed to query like")?;
        Ok(liked.unwrap_or(false))
    }

    fn get_liked_songs(&self, user_id: i64) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT song_id FROM song_likes WHERE user_id = ?1 ORDER BY song_id ASC")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list liked songs")?;
        Ok(ids)
    }

    fn list_likes(&self) -> Result<Vec<SongLike>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, song_id, created_at FROM song_likes ORDER BY user_id ASC, song_id ASC",
        )?;
        let likes = stmt
            .query_map([], |row| {
                Ok(SongLike {
                    user_id: row.get(0)?,
                    song_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list likes")?;
        Ok(likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteUserStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("users.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_create_and_lookup_user() {
        let (_dir, store) = test_store();

        let id = store.create_user("alice").unwrap();
        assert_eq!(store.get_user_id("alice").unwrap(), Some(id));
        assert_eq!(store.get_user_id("bob").unwrap(), None);
    }

    #[test]
    fn test_like_toggle() {
        let (_dir, store) = test_store();
        let user = store.create_user("alice").unwrap();

        store.set_song_liked(user, 7, true).unwrap();
        assert!(store.is_song_liked(user, 7).unwrap());

        store.set_song_liked(user, 7, false).unwrap();
        assert!(!store.is_song_liked(user, 7).unwrap());
    }

    #[test]
    fn test_duplicate_like_is_noop() {
        let (_dir, store) = test_store();
        let user = store.create_user("alice").unwrap();

        store.set_song_liked(user, 7, true).unwrap();
        store.set_song_liked(user, 7, true).unwrap();

        assert_eq!(store.get_liked_songs(user).unwrap(), vec![7]);
        assert_eq!(store.list_likes().unwrap().len(), 1);
    }

    #[test]
    fn test_list_likes_across_users() {
        let (_dir, store) = test_store();
        let alice = store.create_user("alice").unwrap();
        let bob = store.create_user("bob").unwrap();

        store.set_song_liked(alice, 2, true).unwrap();
        store.set_song_liked(alice, 1, true).unwrap();
        store.set_song_liked(bob, 2, true).unwrap();

        let likes = store.list_likes().unwrap();
        let pairs: Vec<(i64, i64)> = likes.iter().map(|l| (l.user_id, l.song_id)).collect();
        assert_eq!(pairs, vec![(alice, 1), (alice, 2), (bob, 2)]);
    }
}
