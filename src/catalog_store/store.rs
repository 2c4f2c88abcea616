use super::models::Song;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_database(db_path.as_ref(), CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get("id")?,
            title: row.get("title")?,
            artist: row.get("artist")?,
            genre: row.get("genre")?,
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn add_song(&self, title: &str, artist: &str, genre: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO songs (title, artist, genre) VALUES (?1, ?2, ?3)",
            params![title, artist, genre],
        )
        .context("Failed to insert song")?;
        Ok(conn.last_insert_rowid())
    }

    fn get_song(&self, song_id: i64) -> Result<Option<Song>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, artist, genre FROM songs WHERE id = ?1",
            params![song_id],
            Self::row_to_song,
        )
        .optional()
        .context("Failed to query song")
    }

    fn list_songs(&self) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, title, artist, genre FROM songs ORDER BY id ASC")?;
        let songs = stmt
            .query_map([], Self::row_to_song)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list songs")?;
        Ok(songs)
    }

    fn songs_by_ids(&self, ids: &[i64]) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, title, artist, genre FROM songs WHERE id = ?1")
            .context("Failed to prepare song lookup")?;
        let mut songs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(song) = stmt
                .query_row(params![id], Self::row_to_song)
                .optional()
                .context("Failed to query song")?
            {
                songs.push(song);
            }
        }
        Ok(songs)
    }

    fn songs_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteCatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(dir.path().join("catalog.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_add_and_get_song() {
        let (_dir, store) = test_store();

        let id = store.add_song("Blue in Green", "Miles Davis", "Jazz").unwrap();
        let song = store.get_song(id).unwrap().unwrap();

        assert_eq!(song.title, "Blue in Green");
        assert_eq!(song.artist, "Miles Davis");
        assert_eq!(song.genre, "Jazz");
    }

    #[test]
    fn test_get_missing_song_returns_none() {
        let (_dir, store) = test_store();
        assert!(store.get_song(42).unwrap().is_none());
    }

    #[test]
    fn test_list_songs_ordered_by_id() {
        let (_dir, store) = test_store();

        let a = store.add_song("A", "X", "Rock").unwrap();
        let b = store.add_song("B", "Y", "Pop").unwrap();
        let c = store.add_song("C", "Z", "Rock").unwrap();

        let songs = store.list_songs().unwrap();
        assert_eq!(
            songs.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![a, b, c]
        );
        assert_eq!(store.songs_count().unwrap(), 3);
    }

    #[test]
    fn test_songs_by_ids_skips_unknown() {
        let (_dir, store) = test_store();

        let a = store.add_song("A", "X", "Rock").unwrap();
        let songs = store.songs_by_ids(&[a, 999]).unwrap();

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, a);
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");

        let id = {
            let store = SqliteCatalogStore::new(&path).unwrap();
            store.add_song("A", "X", "Rock").unwrap()
        };

        let store = SqliteCatalogStore::new(&path).unwrap();
        assert_eq!(store.get_song(id).unwrap().unwrap().title, "A");
    }
}
