use super::context::JobContext;
use super::job::{BackgroundJob, JobError};
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Execute jobs sequentially in a blocking context.
///
/// The run stops at the first failure or cancellation; previously persisted
/// artifacts are never partially overwritten because each job only replaces
/// its output wholesale at the end of a successful pass.
pub async fn run_jobs(jobs: Vec<Arc<dyn BackgroundJob>>, ctx: JobContext) -> Result<()> {
    for job in jobs {
        if ctx.is_cancelled() {
            bail!("Job run cancelled before {}", job.id());
        }

        info!("Starting job {}: {}", job.id(), job.description());
        let started = Instant::now();

        let job_ctx = ctx.clone();
        let job_for_task = job.clone();
        let result = tokio::task::spawn_blocking(move || job_for_task.execute(&job_ctx))
            .await
            .map_err(|e| anyhow::anyhow!("Job {} panicked: {}", job.id(), e))?;

        match result {
            Ok(()) => {
                info!("Job {} finished in {:?}", job.id(), started.elapsed());
            }
            Err(JobError::Cancelled) => {
                info!("Job {} cancelled after {:?}", job.id(), started.elapsed());
                bail!("Job run cancelled during {}", job.id());
            }
            Err(JobError::ExecutionFailed(msg)) => {
                error!("Job {} failed: {}", job.id(), msg);
                bail!("Job {} failed: {}", job.id(), msg);
            }
        }
    }
    Ok(())
}
