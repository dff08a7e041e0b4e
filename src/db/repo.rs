use super::model::{DueEmailJob, ReengagementCandidate};
use crate::model::{EmailJobStatus, EmailKind, MeetingStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. In-memory URLs and non-sqlite schemes pass through
/// untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let path = match url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        Some(p) if !p.is_empty() && !p.starts_with(":memory") => p,
        _ => return url.to_string(),
    };

    let expanded = match path.strip_prefix("~/") {
        Some(tail) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), tail),
            Err(_) => path.to_string(),
        },
        None => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    format!("sqlite://{expanded}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_user(
    pool: &Pool,
    email: &str,
    display_name: Option<&str>,
    last_active_at: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO users (email, display_name, last_active_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(email)
    .bind(display_name)
    .bind(last_active_at)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn touch_user_activity(pool: &Pool, user_id: i64, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE users SET last_active_at = ? WHERE id = ?")
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_meeting(
    pool: &Pool,
    organizer_id: i64,
    title: &str,
    location: Option<&str>,
    start_datetime: DateTime<Utc>,
    end_datetime: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO meetings (organizer_id, title, location, status, start_datetime, end_datetime) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(organizer_id)
    .bind(title)
    .bind(location)
    .bind(MeetingStatus::Scheduled.as_str())
    .bind(start_datetime)
    .bind(end_datetime)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn schedule_email(
    pool: &Pool,
    meeting_id: Option<i64>,
    recipient: &str,
    kind: EmailKind,
    send_at: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO email_jobs (meeting_id, recipient, kind, send_at, status) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(meeting_id)
    .bind(recipient)
    .bind(kind.as_str())
    .bind(send_at)
    .bind(EmailJobStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

/// Complete every `scheduled` meeting whose end has passed. One guarded batch
/// update; the predicate is re-checked by the store at mutation time, so an
/// overlapping run (or a concurrent cancellation) simply matches fewer rows.
/// Returns the number of meetings transitioned.
#[instrument(skip_all)]
pub async fn advance_due_meetings(pool: &Pool, now: DateTime<Utc>) -> Result<u64> {
    let res = sqlx::query(
        "UPDATE meetings SET status = ?, updated_at = ? \
         WHERE status = ? AND datetime(end_datetime) < datetime(?)",
    )
    .bind(MeetingStatus::Completed.as_str())
    .bind(now)
    .bind(MeetingStatus::Scheduled.as_str())
    .bind(now)
    .execute(pool)
    .await
    .context("failed to advance due meetings")?;
    Ok(res.rows_affected())
}

/// All pending jobs whose send time has arrived, oldest due first. Ties on
/// `send_at` break by id so the dispatch order is deterministic.
#[instrument(skip_all)]
pub async fn due_email_jobs(pool: &Pool, now: DateTime<Utc>) -> Result<Vec<DueEmailJob>> {
    let rows = sqlx::query(
        "SELECT j.id, j.recipient, j.kind, m.title AS meeting_title, \
                m.start_datetime AS meeting_start \
         FROM email_jobs j \
         LEFT JOIN meetings m ON j.meeting_id = m.id \
         WHERE j.status = ? AND datetime(j.send_at) <= datetime(?) \
         ORDER BY datetime(j.send_at) ASC, j.id ASC",
    )
    .bind(EmailJobStatus::Pending.as_str())
    .bind(now)
    .fetch_all(pool)
    .await?;

    let jobs = rows
        .into_iter()
        .map(|row| DueEmailJob {
            id: row.get("id"),
            recipient: row.get("recipient"),
            kind: row.get("kind"),
            meeting_title: row.try_get("meeting_title").ok(),
            meeting_start: row
                .try_get::<Option<DateTime<Utc>>, _>("meeting_start")
                .ok()
                .flatten(),
        })
        .collect();
    Ok(jobs)
}

/// Finalize a job the mail provider accepted. Guarded on `pending` so an
/// overlapping run that already finalized the row is a no-op; returns whether
/// this call won the write.
#[instrument(skip_all)]
pub async fn mark_job_sent(pool: &Pool, job_id: i64, now: DateTime<Utc>) -> Result<bool> {
    let res = sqlx::query(
        "UPDATE email_jobs SET status = ?, sent_at = ? WHERE id = ? AND status = ?",
    )
    .bind(EmailJobStatus::Sent.as_str())
    .bind(now)
    .bind(job_id)
    .bind(EmailJobStatus::Pending.as_str())
    .execute(pool)
    .await
    .context("failed to mark email job sent")?;
    Ok(res.rows_affected() == 1)
}

/// Record a rejected dispatch. `sent_at` stays NULL; the job leaves the
/// pending scan and keeps the provider's reason for triage.
#[instrument(skip_all)]
pub async fn mark_job_failed(pool: &Pool, job_id: i64, reason: &str) -> Result<()> {
    sqlx::query("UPDATE email_jobs SET status = ?, last_error = ? WHERE id = ? AND status = ?")
        .bind(EmailJobStatus::Failed.as_str())
        .bind(reason)
        .bind(job_id)
        .bind(EmailJobStatus::Pending.as_str())
        .execute(pool)
        .await
        .context("failed to mark email job failed")?;
    Ok(())
}

/// Users dormant since before `dormant_before` with no nudge newer than
/// `nudged_since`. Recomputed fresh each run; the nudge table is the only
/// state the cooldown rule consults.
#[instrument(skip_all)]
pub async fn reengagement_candidates(
    pool: &Pool,
    dormant_before: DateTime<Utc>,
    nudged_since: DateTime<Utc>,
) -> Result<Vec<ReengagementCandidate>> {
    let rows = sqlx::query(
        "SELECT u.id, u.email, u.display_name \
         FROM users u \
         WHERE datetime(u.last_active_at) < datetime(?) \
           AND NOT EXISTS (SELECT 1 FROM nudges n \
                           WHERE n.user_id = u.id \
                             AND datetime(n.sent_at) > datetime(?)) \
         ORDER BY u.id ASC",
    )
    .bind(dormant_before)
    .bind(nudged_since)
    .fetch_all(pool)
    .await?;

    let candidates = rows
        .into_iter()
        .map(|row| ReengagementCandidate {
            user_id: row.get("id"),
            email: row.get("email"),
            display_name: row
                .try_get::<Option<String>, _>("display_name")
                .ok()
                .flatten(),
        })
        .collect();
    Ok(candidates)
}

#[instrument(skip_all)]
pub async fn record_nudge(pool: &Pool, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
    let rec = sqlx::query("INSERT INTO nudges (user_id, sent_at) VALUES (?, ?) RETURNING id")
        .bind(user_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to record nudge")?;
    Ok(rec.get::<i64, _>("id"))
}
