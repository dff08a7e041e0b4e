use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use pawmeet_jobs::db;
use pawmeet_jobs::handlers::{router, AppState};
use pawmeet_jobs::mailer::{MailerService, OutgoingEmail};
use pawmeet_jobs::model::EmailKind;
use pawmeet_jobs::reengage::ReengagementRules;
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

struct AcceptingMailer;

#[async_trait::async_trait]
impl MailerService for AcceptingMailer {
    async fn send(&self, _email: &OutgoingEmail) -> Result<String> {
        Ok("msg-id".into())
    }
}

fn state(pool: sqlx::SqlitePool, trigger_token: Option<String>) -> AppState {
    AppState {
        pool,
        mailer: Arc::new(AcceptingMailer),
        rules: ReengagementRules::from_days(14, 30),
        trigger_token,
        run_timeout: std::time::Duration::from_secs(30),
    }
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn dispatch_route_returns_envelope() {
    let pool = setup_pool().await;
    db::schedule_email(
        &pool,
        None,
        "walker@x.test",
        EmailKind::MeetingReminder,
        Utc::now() - Duration::minutes(5),
    )
    .await
    .unwrap();

    let app = router(state(pool, None));
    let res = app
        .oneshot(request("POST", "/tasks/dispatch-emails"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["processedCount"], 1);
    assert!(json["message"].is_string());
    assert!(json.get("error").is_none());
    assert!(json.get("failures").is_none());
}

#[tokio::test]
async fn store_failure_maps_to_500() {
    let pool = setup_pool().await;
    pool.close().await;

    let app = router(state(pool, None));
    let res = app
        .oneshot(request("GET", "/tasks/advance-meetings"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(res).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "store operation failed");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn trigger_token_is_enforced() {
    let pool = setup_pool().await;
    let app = router(state(pool, Some("sekrit".into())));

    let res = app
        .clone()
        .oneshot(request("POST", "/tasks/advance-meetings"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(res).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "unauthorized");

    let mut wrong = request("POST", "/tasks/dispatch-reengagement");
    wrong
        .headers_mut()
        .insert("Authorization", "Bearer guess".parse().unwrap());
    let res = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let mut ok = request("POST", "/tasks/advance-meetings");
    ok.headers_mut()
        .insert("Authorization", "Bearer sekrit".parse().unwrap());
    let res = app.oneshot(ok).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["processedCount"], 0);
}
