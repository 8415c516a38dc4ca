pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ratelimit;
pub mod refresh;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use auth::TokenCodec;
use config::AppConfig;
use ratelimit::RateLimiter;

/// Everything the request path needs, owned and injected rather than
/// reached for through globals; tests construct their own.
#[derive(Clone)]
pub struct AppState {
    pub codec: TokenCodec,
    pub limiter: Arc<RateLimiter>,
    pub rate_limiting_enabled: bool,
    pub session_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            codec: TokenCodec::new(&config.security.jwt_secret),
            limiter: Arc::new(RateLimiter::new()),
            rate_limiting_enabled: config.api.enable_rate_limiting,
            session_ttl: chrono::Duration::minutes(config.security.token_ttl_minutes),
            refresh_ttl: chrono::Duration::days(config.security.refresh_token_ttl_days),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes
        .merge(auth_public_routes(state.clone()))
        // Protected API
        .merge(auth_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/refresh", post(handlers::public::auth::refresh_post))
        .route("/auth/logout", post(handlers::public::auth::logout_post))
        // Login-type budget on token acquisition
        .route_layer(from_fn_with_state(state, middleware::auth_rate_limit))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    // require_auth is the outer layer: identity resolves first, so the read
    // limiter keys on user id rather than IP for authenticated callers.
    Router::new()
        .route("/api/auth/whoami", get(handlers::protected::auth::whoami_get))
        .route_layer(from_fn_with_state(state.clone(), middleware::read_rate_limit))
        .route_layer(from_fn_with_state(state, middleware::require_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "ZapAgent API",
            "version": version,
            "description": "Session and permission boundary for the WhatsApp AI-agent admin panel",
            "endpoints": {
                "home": "/ (public)",
                "refresh": "/auth/refresh (public - cookie credential)",
                "logout": "/auth/logout (public)",
                "whoami": "/api/auth/whoami (protected)",
            }
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
