use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use zapagent_api::auth::{Claims, Role, TokenCodec, TokenKind};
use zapagent_api::ratelimit::RateLimiter;
use zapagent_api::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_state() -> AppState {
    AppState {
        codec: TokenCodec::new(TEST_SECRET),
        limiter: Arc::new(RateLimiter::new()),
        rate_limiting_enabled: true,
        session_ttl: Duration::minutes(60),
        refresh_ttl: Duration::days(30),
    }
}

pub fn test_app() -> Router {
    app(test_state())
}

pub fn issue_token(sub: &str, role: Role, ttl_secs: i64) -> String {
    issue_token_of_kind(sub, role, TokenKind::Session, ttl_secs)
}

pub fn issue_refresh_token(sub: &str, role: Role, ttl_secs: i64) -> String {
    issue_token_of_kind(sub, role, TokenKind::Refresh, ttl_secs)
}

fn issue_token_of_kind(sub: &str, role: Role, typ: TokenKind, ttl_secs: i64) -> String {
    let codec = TokenCodec::new(TEST_SECRET);
    let claims = Claims::new(
        sub.to_string(),
        format!("{}@example.com", sub),
        format!("User {}", sub),
        role,
        typ,
        Duration::seconds(ttl_secs),
    );
    codec.issue(&claims).unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
