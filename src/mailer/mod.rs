use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use std::fmt;
use tracing::{info, warn};

use crate::db::{DueEmailJob, ReengagementCandidate};
use crate::mailer::model::SendResp;
use crate::model::EmailKind;

pub mod model;

const MAIL_API_BASE: &str = "https://api.resend.com/";

/// A fully rendered message, ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Narrow capability boundary to the mail provider: submit one message, learn
/// whether it was accepted. The engine awaits the outcome before touching any
/// job state.
#[async_trait]
pub trait MailerService: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpMailClient {
    http: Client,
    base_url: Url,
    token: String,
    from_address: String,
}

impl fmt::Debug for HttpMailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMailClient")
            .field("base_url", &self.base_url)
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl HttpMailClient {
    pub fn new(token: String, from_address: String) -> Self {
        let base_url = Url::parse(MAIL_API_BASE).expect("valid default mail API URL");
        Self::with_base_url(token, from_address, base_url)
    }

    pub fn with_base_url(token: String, from_address: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("pawmeet-jobs/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
            from_address,
        }
    }
}

#[async_trait]
impl MailerService for HttpMailClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let endpoint = self
            .base_url
            .join("emails")
            .context("invalid mail API base URL")?;
        let body = json!({
            "from": self.from_address,
            "to": [email.to],
            "subject": email.subject,
            "text": email.body,
        });

        let res = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .context("failed to reach mail provider")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by mail provider: {}", body);
            return Err(anyhow!("received 429 from mail provider: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!("mail provider error {}: {}", status, body);
            return Err(anyhow!("mail provider error {}: {}", status, body));
        }

        let payload: SendResp = res
            .json()
            .await
            .context("invalid mail provider response JSON")?;
        info!(message_id = %payload.id, "mail provider accepted message");
        Ok(payload.id)
    }
}

/// Render a due job into a message. Fails (as a per-item error) on an unknown
/// kind rather than guessing a template.
pub fn render_job(job: &DueEmailJob) -> Result<OutgoingEmail> {
    let kind = EmailKind::parse_kind(&job.kind)
        .ok_or_else(|| anyhow!("unknown email kind '{}'", job.kind))?;
    let title = job.meeting_title.as_deref().unwrap_or("your walk");
    let email = match kind {
        EmailKind::MeetingReminder => OutgoingEmail {
            to: job.recipient.clone(),
            subject: format!("Reminder: {}", title),
            body: match job.meeting_start {
                Some(start) => format!(
                    "Your walk \"{}\" starts at {}. See you there!",
                    title,
                    format_instant(start)
                ),
                None => format!("Your walk \"{}\" is coming up. See you there!", title),
            },
        },
        EmailKind::MeetingRecap => OutgoingEmail {
            to: job.recipient.clone(),
            subject: format!("How was {}?", title),
            body: format!(
                "Hope \"{}\" went well. Rate the walk and plan your next one on PawMeet.",
                title
            ),
        },
    };
    Ok(email)
}

pub fn render_nudge(candidate: &ReengagementCandidate) -> OutgoingEmail {
    let name = candidate.display_name.as_deref().unwrap_or("there");
    OutgoingEmail {
        to: candidate.email.clone(),
        subject: "The pack misses you!".to_string(),
        body: format!(
            "Hi {}, it's been a while since your last walk. \
             New meetups are waiting near you on PawMeet.",
            name
        ),
    }
}

fn format_instant(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminder_includes_title_and_start() {
        let job = DueEmailJob {
            id: 1,
            recipient: "walker@x.test".into(),
            kind: "meeting_reminder".into(),
            meeting_title: Some("Sunset loop".into()),
            meeting_start: Some(Utc.with_ymd_and_hms(2026, 3, 1, 17, 30, 0).unwrap()),
        };
        let email = render_job(&job).unwrap();
        assert_eq!(email.to, "walker@x.test");
        assert!(email.subject.contains("Sunset loop"));
        assert!(email.body.contains("2026-03-01 17:30 UTC"));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let job = DueEmailJob {
            id: 2,
            recipient: "walker@x.test".into(),
            kind: "carrier_pigeon".into(),
            meeting_title: None,
            meeting_start: None,
        };
        assert!(render_job(&job).is_err());
    }
}
