use crate::db;
use crate::model::BatchResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, instrument};

/// Move every `scheduled` meeting whose end has passed to `completed`.
///
/// The whole pass is one guarded update, so there is no per-row failure list:
/// either the store applied it or the invocation failed. An empty match is a
/// normal success with zero processed.
#[instrument(skip_all)]
pub async fn advance(pool: &SqlitePool, now: DateTime<Utc>) -> Result<BatchResult> {
    let updated = db::advance_due_meetings(pool, now).await?;
    if updated > 0 {
        info!(updated, "completed past-due meetings");
    }
    Ok(BatchResult::ok(updated as i64))
}
