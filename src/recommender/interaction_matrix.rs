//! User x song interaction matrix.
//!
//! Likes are folded into a binary sparse matrix (rows = users, columns =
//! songs). Index assignment is a stable ascending sort of the id universes,
//! so repeated builds over the same inputs reproduce the matrix exactly.

use std::collections::{BTreeSet, HashMap};

/// Binary sparse interaction matrix in CSR form.
///
/// An entry at (user, song) means the user liked the song. Values are
/// implicitly 1.0; like strength is not modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionMatrix {
    user_ids: Vec<i64>,
    song_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    song_index: HashMap<i64, usize>,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
}

impl InteractionMatrix {
    /// Build the matrix from the full universes of user and song ids and the
    /// current like set. Duplicate ids and duplicate (user, song) pairs are
    /// collapsed; likes referencing unknown ids are ignored.
    pub fn build(user_ids: &[i64], song_ids: &[i64], likes: &[(i64, i64)]) -> Self {
        let mut user_ids: Vec<i64> = user_ids.to_vec();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut song_ids: Vec<i64> = song_ids.to_vec();
        song_ids.sort_unstable();
        song_ids.dedup();

        let user_index: HashMap<i64, usize> = user_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let song_index: HashMap<i64, usize> = song_ids
            .iter()
            .enumerate()
            .map(|(j, id)| (*id, j))
            .collect();

        let mut rows: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); user_ids.len()];
        for (user_id, song_id) in likes {
            if let (Some(&u), Some(&s)) = (user_index.get(user_id), song_index.get(song_id)) {
                rows[u].insert(s);
            }
        }

        let mut row_ptr = Vec::with_capacity(user_ids.len() + 1);
        let mut col_indices = Vec::new();
        row_ptr.push(0);
        for row in &rows {
            col_indices.extend(row.iter().copied());
            row_ptr.push(col_indices.len());
        }

        Self {
            user_ids,
            song_ids,
            user_index,
            song_index,
            row_ptr,
            col_indices,
        }
    }

    pub fn n_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn n_songs(&self) -> usize {
        self.song_ids.len()
    }

    /// Number of stored (user, song) entries.
    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }

    /// User ids in row order.
    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    /// Song ids in column order.
    pub fn song_ids(&self) -> &[i64] {
        &self.song_ids
    }

    pub fn user_row(&self, user_id: i64) -> Option<&[usize]> {
        let u = *self.user_index.get(&user_id)?;
        Some(&self.col_indices[self.row_ptr[u]..self.row_ptr[u + 1]])
    }

    pub fn song_column_index(&self, song_id: i64) -> Option<usize> {
        self.song_index.get(&song_id).copied()
    }

    /// Sorted song column indices liked by the user at row `u`.
    pub fn row(&self, u: usize) -> &[usize] {
        &self.col_indices[self.row_ptr[u]..self.row_ptr[u + 1]]
    }

    /// Item-major adjacency: for every song column, the sorted user row
    /// indices that liked it. This is the transposed orientation the
    /// collaborative trainer factorizes.
    pub fn song_rows(&self) -> Vec<Vec<usize>> {
        let mut songs: Vec<Vec<usize>> = vec![Vec::new(); self.song_ids.len()];
        for u in 0..self.user_ids.len() {
            for &s in self.row(u) {
                songs[s].push(u);
            }
        }
        songs
    }
}
