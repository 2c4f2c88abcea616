//! Offline batch job infrastructure.
//!
//! The recommendation pipeline (content vectors, collaborative training,
//! fusion, index build) runs as discrete jobs triggered from the CLI. Each
//! run replaces the prior artifact wholesale; there are no incremental
//! updates.

mod context;
mod job;
pub mod jobs;
mod runner;

pub use context::JobContext;
pub use job::{BackgroundJob, JobError};
pub use runner::run_jobs;
