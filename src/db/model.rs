//! View models returned by repository queries.
//!
//! Keep these structs focused on the data the engine needs per item. Business
//! logic lives in the engine modules.

use chrono::{DateTime, Utc};

/// Email-job slice used by the scheduled dispatcher. `kind` is the raw stored
/// string; the dispatcher parses it when rendering.
#[derive(Debug, Clone)]
pub struct DueEmailJob {
    pub id: i64,
    pub recipient: String,
    pub kind: String,
    pub meeting_title: Option<String>,
    pub meeting_start: Option<DateTime<Utc>>,
}

/// User slice selected by the dormancy rule for a re-engagement nudge.
#[derive(Debug, Clone)]
pub struct ReengagementCandidate {
    pub user_id: i64,
    pub email: String,
    pub display_name: Option<String>,
}
