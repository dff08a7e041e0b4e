use crate::db;
use crate::mailer::{self, MailerService};
use crate::model::BatchResult;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

/// Dormancy threshold and nudge cooldown, both relative to the injected run
/// instant.
#[derive(Debug, Clone, Copy)]
pub struct ReengagementRules {
    pub dormancy: Duration,
    pub cooldown: Duration,
}

impl ReengagementRules {
    pub fn from_days(dormancy_days: u32, cooldown_days: u32) -> Self {
        Self {
            dormancy: Duration::days(i64::from(dormancy_days)),
            cooldown: Duration::days(i64::from(cooldown_days)),
        }
    }
}

/// Nudge every user the dormancy rule selects right now. Eligibility is
/// recomputed from user activity and nudge history on each run; there is no
/// queued state to drift. The nudge record is written only after the provider
/// accepts, so a rejected user stays eligible for the next run instead of
/// sitting out a full cooldown.
#[instrument(skip_all)]
pub async fn dispatch_reengagement(
    pool: &SqlitePool,
    mailer: &dyn MailerService,
    rules: &ReengagementRules,
    now: DateTime<Utc>,
) -> Result<BatchResult> {
    let dormant_before = now - rules.dormancy;
    let nudged_since = now - rules.cooldown;
    let candidates = db::reengagement_candidates(pool, dormant_before, nudged_since).await?;

    let mut result = BatchResult::ok(0);
    for candidate in candidates {
        result.processed_count += 1;
        let email = mailer::render_nudge(&candidate);
        match mailer.send(&email).await {
            Ok(message_id) => {
                db::record_nudge(pool, candidate.user_id, now).await?;
                info!(user_id = candidate.user_id, %message_id, "nudge sent");
            }
            Err(err) => {
                warn!(?err, user_id = candidate.user_id, "nudge rejected");
                result.push_failure(candidate.user_id, err.to_string());
            }
        }
    }

    Ok(result)
}
