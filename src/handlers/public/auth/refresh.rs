// POST /auth/refresh - rotate the session from the httpOnly refresh cookie

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;

use super::{session_cookie, REFRESH_COOKIE_PATH};
use crate::auth::{Claims, TokenKind};
use crate::error::ApiError;
use crate::middleware::auth::{cookie_value, REFRESH_COOKIE, SESSION_COOKIE};
use crate::AppState;

/// Renews a session without re-authentication. Requires the `refresh_token`
/// cookie (credentials must be included by the caller); rotates both the
/// session and refresh cookies and returns the identity. A 401 here is the
/// signal for clients to drop their session entirely.
pub async fn refresh_post(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = cookie_value(&headers, REFRESH_COOKIE).ok_or_else(|| {
        tracing::debug!("refresh rejected: no refresh cookie");
        ApiError::nao_autorizado()
    })?;

    let claims = state.codec.verify(token)?;
    if claims.typ != TokenKind::Refresh {
        tracing::debug!(user = %claims.sub, "refresh rejected: not a refresh-grade token");
        return Err(ApiError::nao_autorizado());
    }

    let session_claims = Claims::new(
        claims.sub.clone(),
        claims.email.clone(),
        claims.name.clone(),
        claims.role,
        TokenKind::Session,
        state.session_ttl,
    );
    let refresh_claims = Claims::new(
        claims.sub.clone(),
        claims.email.clone(),
        claims.name.clone(),
        claims.role,
        TokenKind::Refresh,
        state.refresh_ttl,
    );

    let session_token = state.codec.issue(&session_claims)?;
    let refresh_token = state.codec.issue(&refresh_claims)?;

    tracing::debug!(user = %claims.sub, "session refreshed");

    let cookies = AppendHeaders([
        (
            SET_COOKIE,
            session_cookie(SESSION_COOKIE, &session_token, "/", state.session_ttl.num_seconds()),
        ),
        (
            SET_COOKIE,
            session_cookie(
                REFRESH_COOKIE,
                &refresh_token,
                REFRESH_COOKIE_PATH,
                state.refresh_ttl.num_seconds(),
            ),
        ),
    ]);

    let body = Json(json!({
        "success": true,
        "data": {
            "user": {
                "id": claims.sub,
                "email": claims.email,
                "full_name": claims.name,
                "role": claims.role.as_str(),
            }
        }
    }));

    Ok((cookies, body))
}
