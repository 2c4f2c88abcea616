use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,

    // Feature configs
    pub recommender: Option<RecommenderConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Number of latent factors K for the collaborative model.
    pub factors: Option<usize>,
    /// Power iterations for the truncated SVD.
    pub svd_n_iter: Option<usize>,
    /// Random seed for the SVD range finder.
    pub svd_seed: Option<u64>,
    /// Candidate pool multiplier for index queries.
    pub oversample_factor: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
