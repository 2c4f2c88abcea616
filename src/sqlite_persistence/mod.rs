//! Shared SQLite persistence infrastructure.
//!
//! Every store in this crate (catalog, users/likes, vectors) opens its own
//! database file and declares its tables through [`VersionedSchema`], which
//! handles creation, validation and forward migration via `PRAGMA
//! user_version`.

mod versioned_schema;

pub use versioned_schema::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Open (or create) a database file and bring it to the latest schema.
///
/// A fresh file gets the newest schema directly; an existing file is
/// version-checked, validated against its declared schema and migrated
/// forward one version at a time.
pub fn open_database(
    path: &Path,
    schemas: &'static [VersionedSchema],
    label: &str,
) -> Result<Connection> {
    let is_new_db = !path.exists();

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open {} database at {:?}", label, path))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    if is_new_db {
        info!("Creating new {} database at {:?}", label, path);
        schemas.last().unwrap().create(&conn)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let db_version = raw_version - BASE_DB_VERSION as i64;

    if db_version < 1 {
        anyhow::bail!(
            "{} database version {} is invalid (expected >= 1)",
            label,
            db_version
        );
    }

    let current_schema_version = schemas.last().unwrap().version as i64;

    let version_index = schemas
        .iter()
        .position(|s| s.version == db_version as usize)
        .with_context(|| format!("Unknown {} database version {}", label, db_version))?;
    schemas[version_index].validate(&conn).with_context(|| {
        format!(
            "{} database schema validation failed for version {}",
            label, db_version
        )
    })?;

    if db_version < current_schema_version {
        info!(
            "Migrating {} database from version {} to {}",
            label, db_version, current_schema_version
        );
        migrate(&mut conn, schemas, db_version as usize)?;
    }

    Ok(conn)
}

fn migrate(
    conn: &mut Connection,
    schemas: &'static [VersionedSchema],
    from_version: usize,
) -> Result<()> {
    let tx = conn.transaction()?;
    let mut latest = from_version;
    for schema in schemas {
        if schema.version > from_version {
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
            latest = schema.version;
        }
    }
    tx.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest),
        [],
    )?;
    tx.commit()?;
    Ok(())
}
