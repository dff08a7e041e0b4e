//! HTTP edge for the external scheduler. Each route wraps one engine entry
//! point: the trigger supplies the cadence, the handler supplies `now` and
//! the run bound, and the engine does the rest.

use crate::advance;
use crate::dispatch;
use crate::mailer::MailerService;
use crate::model::{BatchResult, ItemFailure};
use crate::reengage::{self, ReengagementRules};
use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub mailer: Arc<dyn MailerService>,
    pub rules: ReengagementRules,
    pub trigger_token: Option<String>,
    pub run_timeout: Duration,
}

/// JSON envelope returned to the trigger. Always structured, never a raw
/// error dump.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_count: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TriggerResponse {
    fn completed(message: &str, result: BatchResult) -> Self {
        Self {
            success: result.success,
            message: Some(message.to_string()),
            processed_count: Some(result.processed_count),
            failures: result.failures,
            error: None,
            details: None,
        }
    }

    fn failed(error: &str, details: String) -> Self {
        Self {
            success: false,
            message: None,
            processed_count: None,
            failures: Vec::new(),
            error: Some(error.to_string()),
            details: Some(details),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/tasks/advance-meetings",
            get(advance_meetings).post(advance_meetings),
        )
        .route(
            "/tasks/dispatch-emails",
            get(dispatch_emails).post(dispatch_emails),
        )
        .route(
            "/tasks/dispatch-reengagement",
            get(dispatch_reengagement).post(dispatch_reengagement),
        )
        .with_state(state)
}

async fn advance_meetings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<TriggerResponse>) {
    if let Some(denied) = check_trigger_token(&state, &headers) {
        return denied;
    }
    let fut = advance::advance(&state.pool, Utc::now());
    run_bounded("meeting statuses advanced", state.run_timeout, fut).await
}

async fn dispatch_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<TriggerResponse>) {
    if let Some(denied) = check_trigger_token(&state, &headers) {
        return denied;
    }
    let fut = dispatch::dispatch_scheduled(&state.pool, state.mailer.as_ref(), Utc::now());
    run_bounded("scheduled emails dispatched", state.run_timeout, fut).await
}

async fn dispatch_reengagement(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<TriggerResponse>) {
    if let Some(denied) = check_trigger_token(&state, &headers) {
        return denied;
    }
    let fut = reengage::dispatch_reengagement(
        &state.pool,
        state.mailer.as_ref(),
        &state.rules,
        Utc::now(),
    );
    run_bounded("re-engagement nudges dispatched", state.run_timeout, fut).await
}

/// Bound one invocation by wall clock. Per-item mutations already committed
/// stand; the rest of the batch waits for the next trigger.
async fn run_bounded(
    message: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<BatchResult>>,
) -> (StatusCode, Json<TriggerResponse>) {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(result)) => (
            StatusCode::OK,
            Json(TriggerResponse::completed(message, result)),
        ),
        Ok(Err(err)) => {
            error!(?err, "engine run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::failed("store operation failed", format!("{err:#}"))),
            )
        }
        Err(_) => {
            error!("engine run exceeded its wall-clock bound");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::failed(
                    "run timed out",
                    "remaining items wait for the next trigger".to_string(),
                )),
            )
        }
    }
}

fn check_trigger_token(
    state: &AppState,
    headers: &HeaderMap,
) -> Option<(StatusCode, Json<TriggerResponse>)> {
    let expected = state.trigger_token.as_deref()?;
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        None
    } else {
        Some((
            StatusCode::UNAUTHORIZED,
            Json(TriggerResponse::failed(
                "unauthorized",
                "missing or invalid trigger token".to_string(),
            )),
        ))
    }
}
