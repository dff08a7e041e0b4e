use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmailJobStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailJobStatus::Pending => "pending",
            EmailJobStatus::Sent => "sent",
            EmailJobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmailKind {
    MeetingReminder,
    MeetingRecap,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::MeetingReminder => "meeting_reminder",
            EmailKind::MeetingRecap => "meeting_recap",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "meeting_reminder" => Some(EmailKind::MeetingReminder),
            "meeting_recap" => Some(EmailKind::MeetingRecap),
            _ => None,
        }
    }
}

/// One item the batch could not complete. `id` is the row the failure is
/// about: the job id for scheduled emails, the user id for nudges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub id: i64,
    pub reason: String,
}

/// Outcome of one engine invocation. Built fresh per run, returned to the
/// trigger caller, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub processed_count: i64,
    pub failures: Vec<ItemFailure>,
}

impl BatchResult {
    pub fn ok(processed_count: i64) -> Self {
        Self {
            success: true,
            processed_count,
            failures: Vec::new(),
        }
    }

    pub fn push_failure(&mut self, id: i64, reason: impl Into<String>) {
        self.failures.push(ItemFailure {
            id,
            reason: reason.into(),
        });
    }
}
