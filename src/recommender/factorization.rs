//! Collaborative latent factors via truncated SVD.
//!
//! The interaction matrix is factorized in item-major orientation (songs x
//! users) with a randomized range finder: seeded Gaussian projection, a few
//! power iterations for spectral separation, then an exact eigensolve of the
//! small Gram matrix. Each song's row of `U_k * Sigma_k` is its CF vector.
//! The whole procedure is deterministic for a fixed seed.

use super::interaction_matrix::InteractionMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::cmp::Ordering;
use tracing::warn;

/// Extra subspace columns beyond the requested rank, for range-finder
/// accuracy.
const OVERSAMPLE_COLUMNS: usize = 8;

const ZERO_TOLERANCE: f64 = 1e-12;

/// Trained collaborative-filtering model: one factor row per song column of
/// the interaction matrix, in column order.
#[derive(Debug, Clone)]
pub struct CfModel {
    pub factors: usize,
    pub song_ids: Vec<i64>,
    pub item_factors: Vec<Vec<f32>>,
}

impl CfModel {
    /// Factor row for a song, if the song was a column of the trained
    /// matrix.
    pub fn factors_for(&self, song_id: i64) -> Option<&[f32]> {
        let idx = self.song_ids.binary_search(&song_id).ok()?;
        Some(&self.item_factors[idx])
    }
}

/// Train item latent factors from the interaction matrix.
///
/// `factors` is clamped down to min(|songs|, |users|) - 1. Returns None when
/// there is nothing to factorize (no interactions, or the clamped rank is
/// zero); callers fall back to content-only hybrid vectors in that case.
pub fn train_item_factors(
    matrix: &InteractionMatrix,
    factors: usize,
    n_iter: usize,
    seed: u64,
) -> Option<CfModel> {
    let n_songs = matrix.n_songs();
    let n_users = matrix.n_users();
    let min_dim = n_songs.min(n_users);

    if matrix.nnz() == 0 {
        warn!("Interaction matrix has no entries, skipping factorization");
        return None;
    }

    let k = factors.min(min_dim.saturating_sub(1));
    if k == 0 {
        warn!(
            "Cannot factorize a {}x{} matrix into any factors",
            n_users, n_songs
        );
        return None;
    }
    if k < factors {
        warn!(
            "Clamping factor count from {} to {} for a {}x{} interaction matrix",
            factors, k, n_users, n_songs
        );
    }

    let song_rows = matrix.song_rows();
    let l = (k + OVERSAMPLE_COLUMNS).min(min_dim);
    let mut rng = StdRng::seed_from_u64(seed);

    // Range finder: project random user-space directions through the matrix.
    let mut basis: Vec<Vec<f64>> = (0..l)
        .map(|_| {
            let omega: Vec<f64> = (0..n_users).map(|_| rng.sample(StandardNormal)).collect();
            item_mat_vec(&song_rows, &omega)
        })
        .collect();
    orthonormalize(&mut basis);

    // Power iterations sharpen the captured subspace.
    for _ in 0..n_iter {
        let mut user_space: Vec<Vec<f64>> = basis
            .iter()
            .map(|q| item_mat_t_vec(&song_rows, q, n_users))
            .collect();
        orthonormalize(&mut user_space);
        basis = user_space
            .iter()
            .map(|z| item_mat_vec(&song_rows, z))
            .collect();
        orthonormalize(&mut basis);
    }

    // B = Q^T A, then eigensolve G = B B^T to recover singular pairs.
    let b: Vec<Vec<f64>> = basis
        .iter()
        .map(|q| item_mat_t_vec(&song_rows, q, n_users))
        .collect();
    let mut gram = vec![vec![0.0; l]; l];
    for p in 0..l {
        for q in p..l {
            let d = dot(&b[p], &b[q]);
            gram[p][q] = d;
            gram[q][p] = d;
        }
    }
    let (eigenvalues, eigenvectors) = jacobi_eigen(gram);

    let mut order: Vec<usize> = (0..l).collect();
    order.sort_by(|&a, &b| {
        eigenvalues[b]
            .partial_cmp(&eigenvalues[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    // item_factors = Q * W_k * Sigma_k, one row per song.
    let mut item_factors = vec![vec![0.0f32; k]; n_songs];
    for (t, &c) in order.iter().take(k).enumerate() {
        let sigma = eigenvalues[c].max(0.0).sqrt();
        for i in 0..n_songs {
            let mut u = 0.0;
            for (j, column) in basis.iter().enumerate() {
                u += column[i] * eigenvectors[j][c];
            }
            item_factors[i][t] = (u * sigma) as f32;
        }
    }

    Some(CfModel {
        factors: k,
        song_ids: matrix.song_ids().to_vec(),
        item_factors,
    })
}

/// y = A x for the item-major matrix (songs x users).
fn item_mat_vec(song_rows: &[Vec<usize>], x: &[f64]) -> Vec<f64> {
    song_rows
        .iter()
        .map(|users| users.iter().map(|&u| x[u]).sum())
        .collect()
}

/// z = A^T y for the item-major matrix.
fn item_mat_t_vec(song_rows: &[Vec<usize>], y: &[f64], n_users: usize) -> Vec<f64> {
    let mut z = vec![0.0; n_users];
    for (i, users) in song_rows.iter().enumerate() {
        for &u in users {
            z[u] += y[i];
        }
    }
    z
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Modified Gram-Schmidt over columns. Columns that collapse below the zero
/// tolerance (rank deficiency) are zeroed rather than divided.
fn orthonormalize(columns: &mut [Vec<f64>]) {
    for j in 0..columns.len() {
        let (head, tail) = columns.split_at_mut(j);
        let column = &mut tail[0];
        for prev in head.iter() {
            let d = dot(prev, column);
            if d != 0.0 {
                for (c, p) in column.iter_mut().zip(prev.iter()) {
                    *c -= d * p;
                }
            }
        }
        let n = norm(column);
        if n > ZERO_TOLERANCE {
            for c in column.iter_mut() {
                *c /= n;
            }
        } else {
            for c in column.iter_mut() {
                *c = 0.0;
            }
        }
    }
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix.
///
/// Returns (eigenvalues, eigenvector matrix); column c of the matrix is the
/// eigenvector for eigenvalue c.
fn jacobi_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _sweep in 0..100 {
        let mut off_diagonal = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off_diagonal += a[p][q] * a[p][q];
            }
        }
        if off_diagonal.sqrt() < ZERO_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq.abs() < ZERO_TOLERANCE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for i in 0..n {
                    let aip = a[i][p];
                    let aiq = a[i][q];
                    a[i][p] = c * aip - s * aiq;
                    a[i][q] = s * aip + c * aiq;
                }
                for i in 0..n {
                    let api = a[p][i];
                    let aqi = a[q][i];
                    a[p][i] = c * api - s * aqi;
                    a[q][i] = s * api + c * aqi;
                }
                for i in 0..n {
                    let vip = v[i][p];
                    let viq = v[i][q];
                    v[i][p] = c * vip - s * viq;
                    v[i][q] = s * vip + c * viq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i][i]).collect();
    (eigenvalues, v)
}
