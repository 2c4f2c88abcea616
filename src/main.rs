use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod background_jobs;
use background_jobs::{jobs, run_jobs, JobContext};

mod catalog_store;
use catalog_store::{CatalogStore, SqliteCatalogStore};

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod recommender;
use recommender::{
    content_matrix_from_store, ratings_matrix_from_store, score_all, AnnRecommender,
    DenseRecommender, Recommender,
};

mod sqlite_persistence;

mod user_store;
use user_store::{SqliteUserStore, UserStore};

mod vector_store;
use vector_store::SqliteVectorStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "recommender", version)]
struct CliArgs {
    /// Directory holding the catalog, user and vector databases.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one-hot content vectors for every cataloged song.
    ContentVectors,

    /// Build the interaction matrix from likes and train the CF model.
    TrainCf {
        /// Number of latent factors K (overrides config).
        #[clap(long)]
        factors: Option<usize>,
    },

    /// Fuse content and cf vectors into hybrid vectors.
    HybridVectors,

    /// Build and persist the similarity index over hybrid vectors.
    BuildIndex,

    /// Run the full offline pipeline in order.
    Pipeline {
        /// Number of latent factors K (overrides config).
        #[clap(long)]
        factors: Option<usize>,
    },

    /// Recommend songs similar to a seed set.
    Recommend {
        /// Seed song ids, comma separated (e.g. a playlist's members).
        #[clap(long, value_delimiter = ',', required_unless_present = "user")]
        seeds: Vec<i64>,

        /// Seed from this user's liked songs instead of explicit ids.
        #[clap(long, conflicts_with = "seeds")]
        user: Option<i64>,

        /// Number of recommendations to return.
        #[clap(long, default_value_t = 10)]
        top_n: usize,

        /// Use the dense matrix scorer instead of the index.
        #[clap(long)]
        dense: bool,

        /// Content vs. collaborative weight for the dense scorer.
        #[clap(long, default_value_t = 0.5)]
        alpha: f32,
    },

    /// Score every song for a user through the dense matrix path.
    Score {
        /// User id to score for.
        #[clap(long)]
        user: i64,

        /// Content vs. collaborative weight.
        #[clap(long, default_value_t = 0.5)]
        alpha: f32,

        /// Number of scored songs to print.
        #[clap(long, default_value_t = 10)]
        top_n: usize,
    },
}

struct Stores {
    catalog: Arc<SqliteCatalogStore>,
    users: Arc<SqliteUserStore>,
    vectors: Arc<SqliteVectorStore>,
}

fn open_stores(config: &AppConfig) -> Result<Stores> {
    Ok(Stores {
        catalog: Arc::new(SqliteCatalogStore::new(&config.catalog_db)?),
        users: Arc::new(SqliteUserStore::new(&config.user_db)?),
        vectors: Arc::new(SqliteVectorStore::new(
            config.vector_db.clone(),
            config.snapshot_path.clone(),
        )?),
    })
}

fn print_recommendations(catalog: &dyn CatalogStore, song_ids: &[i64]) -> Result<()> {
    if song_ids.is_empty() {
        println!("No recommendations available.");
        return Ok(());
    }
    let songs = catalog.songs_by_ids(song_ids)?;
    let by_id: std::collections::HashMap<i64, &catalog_store::Song> =
        songs.iter().map(|s| (s.id, s)).collect();
    for (rank, song_id) in song_ids.iter().enumerate() {
        match by_id.get(song_id) {
            Some(song) => println!(
                "{:>3}. [{}] {} - {} ({})",
                rank + 1,
                song.id,
                song.artist,
                song.title,
                song.genre
            ),
            None => println!("{:>3}. [{}] <not in catalog>", rank + 1, song_id),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir.clone(),
    };
    let mut config = AppConfig::resolve(&cli_config, file_config)?;

    // Subcommand-level factor overrides beat both CLI and file config.
    if let Command::TrainCf {
        factors: Some(factors),
    }
    | Command::Pipeline {
        factors: Some(factors),
    } = &cli_args.command
    {
        config.recommender.factors = *factors;
    }

    let stores = open_stores(&config)?;

    let cancellation_token = CancellationToken::new();
    let ctrlc_token = cancellation_token.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling current run");
        ctrlc_token.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let job_context = JobContext::new(
        cancellation_token,
        stores.catalog.clone(),
        stores.users.clone(),
        stores.vectors.clone(),
        config.recommender.clone(),
    );

    match cli_args.command {
        Command::ContentVectors => {
            run_jobs(vec![Arc::new(jobs::ContentVectorsJob)], job_context).await?;
        }
        Command::TrainCf { .. } => {
            run_jobs(vec![Arc::new(jobs::TrainCfJob)], job_context).await?;
        }
        Command::HybridVectors => {
            run_jobs(vec![Arc::new(jobs::HybridVectorsJob)], job_context).await?;
        }
        Command::BuildIndex => {
            run_jobs(vec![Arc::new(jobs::BuildIndexJob)], job_context).await?;
        }
        Command::Pipeline { .. } => {
            run_jobs(jobs::pipeline_jobs(), job_context).await?;
        }
        Command::Recommend {
            seeds,
            user,
            top_n,
            dense,
            alpha,
        } => {
            let seeds = match user {
                Some(user_id) => {
                    let liked = stores.users.get_liked_songs(user_id)?;
                    if liked.is_empty() {
                        warn!("User {} has no liked songs to seed from", user_id);
                    }
                    liked
                }
                None => seeds,
            };

            let recommender: Box<dyn Recommender> = if dense {
                Box::new(DenseRecommender::new(
                    stores.catalog.clone(),
                    stores.users.clone(),
                    stores.vectors.clone(),
                    alpha,
                ))
            } else {
                Box::new(AnnRecommender::new(
                    stores.vectors.clone(),
                    config.recommender.oversample_factor,
                ))
            };

            let result = recommender.recommend_unseen(&seeds, top_n)?;
            info!(
                "Computed {} recommendations for {} seeds",
                result.len(),
                seeds.len()
            );
            print_recommendations(stores.catalog.as_ref(), &result)?;
        }
        Command::Score {
            user,
            alpha,
            top_n,
        } => {
            let songs = stores.catalog.list_songs()?;
            let song_ids: Vec<i64> = songs.iter().map(|s| s.id).collect();
            let content = content_matrix_from_store(&song_ids, stores.vectors.as_ref())?;
            let ratings = ratings_matrix_from_store(&song_ids, stores.users.as_ref(), None)?;

            let result = score_all(user, &content, &ratings, alpha)?;
            if result.degraded {
                warn!("User {} has no likes; scores carry no signal", user);
            }
            for (rank, (song_id, score)) in result.scores.iter().take(top_n).enumerate() {
                println!("{:>3}. song {:>6}  score {:.4}", rank + 1, song_id, score);
            }
        }
    }

    Ok(())
}
