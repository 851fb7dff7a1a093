//! Background jobs

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::borrows::BorrowsService;

/// Start the overdue sweep on `cron` (six fields, seconds first).
///
/// The returned scheduler must be kept alive for the job to keep running.
pub async fn start_overdue_sweep(
    borrows: BorrowsService,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _l| {
        let borrows = borrows.clone();
        Box::pin(async move {
            let today = Utc::now().date_naive();
            match borrows.mark_overdue(today).await {
                Ok(count) => tracing::debug!(count, "Overdue sweep completed"),
                Err(e) => tracing::error!("Overdue sweep failed: {}", e),
            }
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    tracing::info!(cron, "Overdue sweep scheduled");
    Ok(sched)
}
