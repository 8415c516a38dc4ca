use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::ratelimit::{client_key, policy, RateLimitPolicy};
use crate::AppState;

/// Enforce a fixed-window budget for this request, keyed on the
/// authenticated user when present (auth middleware must run first for
/// that), otherwise on the caller IP.
async fn enforce(
    state: AppState,
    policy: RateLimitPolicy,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.rate_limiting_enabled {
        return Ok(next.run(request).await);
    }

    let user = request.extensions().get::<AuthUser>();
    let key = client_key(user, request.headers());
    let decision = state.limiter.check(&key, &policy);

    if !decision.allowed {
        let retry_after = decision.retry_after_secs.unwrap_or(1);
        tracing::debug!(%key, retry_after, "request rate limited");
        return Err(ApiError::too_many_requests(
            "Muitas requisições. Tente novamente mais tarde.",
            retry_after,
        ));
    }

    Ok(next.run(request).await)
}

pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(state, policy::AUTH, request, next).await
}

pub async fn read_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(state, policy::READ, request, next).await
}

pub async fn write_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(state, policy::WRITE, request, next).await
}

pub async fn sensitive_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(state, policy::SENSITIVE, request, next).await
}
