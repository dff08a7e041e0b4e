use crate::db;
use crate::mailer::{self, MailerService};
use crate::model::BatchResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

/// Send every pending email job whose send time has arrived, oldest due
/// first. A rejected or malformed job is recorded in the result and the batch
/// keeps going; only a store failure aborts the run.
///
/// Delivery is at-least-once: the `sent` mark is written only after the
/// provider accepts, so a crash between acceptance and the mark can cause a
/// re-send on a later run. That window is an accepted trade-off, not a bug to
/// patch with extra state.
#[instrument(skip_all)]
pub async fn dispatch_scheduled(
    pool: &SqlitePool,
    mailer: &dyn MailerService,
    now: DateTime<Utc>,
) -> Result<BatchResult> {
    let jobs = db::due_email_jobs(pool, now).await?;
    let mut result = BatchResult::ok(0);

    for job in jobs {
        result.processed_count += 1;

        if job.recipient.trim().is_empty() {
            warn!(job_id = job.id, "email job has no recipient");
            db::mark_job_failed(pool, job.id, "missing recipient").await?;
            result.push_failure(job.id, "missing recipient");
            continue;
        }

        let email = match mailer::render_job(&job) {
            Ok(email) => email,
            Err(err) => {
                warn!(?err, job_id = job.id, "email job could not be rendered");
                db::mark_job_failed(pool, job.id, &err.to_string()).await?;
                result.push_failure(job.id, err.to_string());
                continue;
            }
        };

        match mailer.send(&email).await {
            Ok(message_id) => {
                if db::mark_job_sent(pool, job.id, now).await? {
                    info!(job_id = job.id, %message_id, "email job sent");
                } else {
                    // An overlapping run finalized this row first; the message
                    // went out twice, which at-least-once permits.
                    warn!(job_id = job.id, "job already finalized by another run");
                }
            }
            Err(err) => {
                warn!(?err, job_id = job.id, "mail provider rejected job");
                db::mark_job_failed(pool, job.id, &err.to_string()).await?;
                result.push_failure(job.id, err.to_string());
            }
        }
    }

    Ok(result)
}
