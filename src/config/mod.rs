mod file_config;

pub use file_config::{FileConfig, RecommenderConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
}

/// Recommender tunables with the defaults the pipeline ships with.
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    /// Target latent factor count K; clamped down for small catalogs.
    pub factors: usize,
    /// SVD power iterations.
    pub svd_n_iter: usize,
    /// Seed for the randomized SVD, fixed for reproducible training runs.
    pub svd_seed: u64,
    /// Index queries fetch `oversample_factor * top_n` candidates to
    /// survive exclusion filtering.
    pub oversample_factor: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            factors: 50,
            svd_n_iter: 10,
            svd_seed: 42,
            oversample_factor: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub catalog_db: PathBuf,
    pub user_db: PathBuf,
    pub vector_db: PathBuf,
    pub snapshot_path: PathBuf,
    pub recommender: RecommenderSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let defaults = RecommenderSettings::default();
        let rec_file = file.recommender.unwrap_or_default();
        let recommender = RecommenderSettings {
            factors: rec_file.factors.unwrap_or(defaults.factors),
            svd_n_iter: rec_file.svd_n_iter.unwrap_or(defaults.svd_n_iter),
            svd_seed: rec_file.svd_seed.unwrap_or(defaults.svd_seed),
            oversample_factor: rec_file
                .oversample_factor
                .unwrap_or(defaults.oversample_factor),
        };
        if recommender.factors == 0 {
            bail!("recommender.factors must be at least 1");
        }
        if recommender.oversample_factor == 0 {
            bail!("recommender.oversample_factor must be at least 1");
        }

        Ok(Self {
            catalog_db: db_dir.join("catalog.db"),
            user_db: db_dir.join("users.db"),
            vector_db: db_dir.join("vectors.db"),
            snapshot_path: db_dir.join("song_index.json"),
            db_dir,
            recommender,
        })
    }
}
