use serde::{Deserialize, Serialize};

/// A cataloged song with the content attributes the recommender encodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub genre: String,
}
