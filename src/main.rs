use std::time::Duration;

use zapagent_api::{app, config, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up JWT_SECRET, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting ZapAgent API in {:?} mode", config.environment);

    let state = AppState::from_config(config);

    // Periodic sweep of expired rate-limit windows; aborted on shutdown
    let sweeper = state
        .limiter
        .spawn_sweeper(Duration::from_secs(config.api.sweep_period_secs));

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ZAPAGENT_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("ZapAgent API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    sweeper.abort();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
