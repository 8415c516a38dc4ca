// POST /auth/logout - clear all session cookies

use axum::{
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;

use super::{expired_cookie, REFRESH_COOKIE_PATH};
use crate::middleware::auth::{LEGACY_USER_COOKIE, REFRESH_COOKIE, SESSION_COOKIE};

/// Expires every session-related cookie by name. Idempotent: returns the
/// same success shape whether or not any cookie was present.
pub async fn logout_post() -> impl IntoResponse {
    let cookies = AppendHeaders([
        (SET_COOKIE, expired_cookie(SESSION_COOKIE, "/")),
        (SET_COOKIE, expired_cookie(LEGACY_USER_COOKIE, "/")),
        (SET_COOKIE, expired_cookie(REFRESH_COOKIE, REFRESH_COOKIE_PATH)),
    ]);

    (cookies, Json(json!({ "success": true })))
}
