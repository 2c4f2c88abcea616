//! SQLite schema definitions for the vector database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Song vectors table - one row per song, vectors as JSON arrays.
const SONG_VECTORS_TABLE_V1: Table = Table {
    name: "song_vectors",
    columns: &[
        sqlite_column!("song_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("content_vector", &SqlType::Text),
        sqlite_column!("cf_vector", &SqlType::Text),
        sqlite_column!("hybrid_vector", &SqlType::Text),
        sqlite_column!("universe_epoch", &SqlType::Integer),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Recommender state table - key-value store for the content universe and
/// other pipeline state.
const RECOMMENDER_STATE_TABLE_V1: Table = Table {
    name: "recommender_state",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const VECTOR_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[SONG_VECTORS_TABLE_V1, RECOMMENDER_STATE_TABLE_V1],
    migration: None,
}];
