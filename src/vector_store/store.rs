use super::models::{StoredVector, VectorKind};
use super::schema::VECTOR_VERSIONED_SCHEMAS;
use super::snapshot;
use super::trait_def::VectorStore;
use crate::recommender::{ContentUniverse, IndexSnapshot};
use crate::sqlite_persistence::open_database;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const UNIVERSE_STATE_KEY: &str = "content_universe";

pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    snapshot_path: PathBuf,
}

impl SqliteVectorStore {
    pub fn new<P: AsRef<Path>>(db_path: P, snapshot_path: P) -> Result<Self> {
        let conn = open_database(db_path.as_ref(), VECTOR_VERSIONED_SCHEMAS, "vector")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        })
    }

    fn parse_values(song_id: i64, kind: VectorKind, json: &str) -> Result<Vec<f32>> {
        serde_json::from_str(json).with_context(|| {
            format!("Corrupt {} vector stored for song {}", kind, song_id)
        })
    }
}

impl VectorStore for SqliteVectorStore {
    fn save_vector(
        &self,
        song_id: i64,
        kind: VectorKind,
        values: &[f32],
        universe_epoch: Option<i64>,
    ) -> Result<()> {
        let json = serde_json::to_string(values).context("Failed to serialize vector")?;
        let conn = self.conn.lock().unwrap();
        let column = kind.column();

        // Cf vectors do not depend on the content universe, so a cf save
        // leaves the row's epoch untouched.
        let sql = match kind {
            VectorKind::Cf => format!(
                "INSERT INTO song_vectors (song_id, {column}) VALUES (?1, ?2)
                 ON CONFLICT(song_id) DO UPDATE SET {column} = ?2,
                 updated_at = (cast(strftime('%s','now') as int))"
            ),
            VectorKind::Content | VectorKind::Hybrid => format!(
                "INSERT INTO song_vectors (song_id, {column}, universe_epoch) VALUES (?1, ?2, ?3)
                 ON CONFLICT(song_id) DO UPDATE SET {column} = ?2, universe_epoch = ?3,
                 updated_at = (cast(strftime('%s','now') as int))"
            ),
        };

        match kind {
            VectorKind::Cf => conn
                .execute(&sql, params![song_id, json])
                .with_context(|| format!("Failed to save {} vector for song {}", kind, song_id))?,
            _ => conn
                .execute(&sql, params![song_id, json, universe_epoch])
                .with_context(|| format!("Failed to save {} vector for song {}", kind, song_id))?,
        };
        Ok(())
    }

    fn load_vector(&self, song_id: i64, kind: VectorKind) -> Result<Option<StoredVector>> {
        let conn = self.conn.lock().unwrap();
        let column = kind.column();
        let row: Option<(String, Option<i64>, i64)> = conn
            .query_row(
                &format!(
                    "SELECT {column}, universe_epoch, updated_at FROM song_vectors
                     WHERE song_id = ?1 AND {column} IS NOT NULL"
                ),
                params![song_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .with_context(|| format!("Failed to load {} vector for song {}", kind, song_id))?;

        match row {
            None => Ok(None),
            Some((json, epoch, updated_at)) => Ok(Some(StoredVector {
                song_id,
                kind,
                values: Self::parse_values(song_id, kind, &json)?,
                universe_epoch: match kind {
                    VectorKind::Cf => None,
                    _ => epoch,
                },
                updated_at,
            })),
        }
    }

    fn load_all_vectors(&self, kind: VectorKind) -> Result<Vec<StoredVector>> {
        let conn = self.conn.lock().unwrap();
        let column = kind.column();
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id, {column}, universe_epoch, updated_at FROM song_vectors
             WHERE {column} IS NOT NULL ORDER BY song_id ASC"
        ))?;
        let rows: Vec<(i64, String, Option<i64>, i64)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to load {} vectors", kind))?;

        rows.into_iter()
            .map(|(song_id, json, epoch, updated_at)| {
                Ok(StoredVector {
                    song_id,
                    kind,
                    values: Self::parse_values(song_id, kind, &json)?,
                    universe_epoch: match kind {
                        VectorKind::Cf => None,
                        _ => epoch,
                    },
                    updated_at,
                })
            })
            .collect()
    }

    fn clear_vectors(&self, kind: VectorKind) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let column = kind.column();
        let changed = conn
            .execute(
                &format!(
                    "UPDATE song_vectors SET {column} = NULL,
                     updated_at = (cast(strftime('%s','now') as int))
                     WHERE {column} IS NOT NULL"
                ),
                [],
            )
            .with_context(|| format!("Failed to clear {} vectors", kind))?;
        Ok(changed)
    }

    fn prune_songs_not_in(&self, keep: &[i64]) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        if keep.is_empty() {
            return conn
                .execute("DELETE FROM song_vectors", [])
                .context("Failed to prune vector rows");
        }
        let placeholders = vec!["?"; keep.len()].join(", ");
        let deleted = conn
            .execute(
                &format!("DELETE FROM song_vectors WHERE song_id NOT IN ({placeholders})"),
                rusqlite::params_from_iter(keep.iter()),
            )
            .context("Failed to prune vector rows")?;
        Ok(deleted)
    }

    fn save_universe(&self, universe: &ContentUniverse) -> Result<()> {
        let json = serde_json::to_string(universe).context("Failed to serialize universe")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO recommender_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2,
             updated_at = (cast(strftime('%s','now') as int))",
            params![UNIVERSE_STATE_KEY, json],
        )
        .context("Failed to save content universe")?;
        Ok(())
    }

    fn load_universe(&self) -> Result<Option<ContentUniverse>> {
        let conn = self.conn.lock().unwrap();
        let json: Option<String> = conn
            .query_row(
                "SELECT value FROM recommender_state WHERE key = ?1",
                params![UNIVERSE_STATE_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to load content universe")?;
        match json {
            None => Ok(None),
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Corrupt content universe state")?,
            )),
        }
    }

    fn save_index_snapshot(&self, snapshot: &IndexSnapshot) -> Result<()> {
        snapshot::save_snapshot(&self.snapshot_path, snapshot)
    }

    fn load_index_snapshot(&self) -> Result<Option<IndexSnapshot>> {
        snapshot::load_snapshot(&self.snapshot_path)
    }
}
