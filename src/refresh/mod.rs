//! Client-side session keep-alive.
//!
//! Proactively renews the session token on a fixed period well inside the
//! token lifetime, collapses concurrent refresh triggers into one network
//! call, and distinguishes a definitive rejection (401, forced logout) from
//! transient failures (retried on the next tick).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::auth::Role;

/// Identity as returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Definitive outcomes of a refresh call.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Server rotated the cookies and returned the identity.
    Refreshed(SessionUser),
    /// HTTP 401: the refresh credential itself is no longer valid.
    Denied,
}

/// Transient failures. The session stays untouched and the next scheduled
/// tick retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("refresh request failed: {0}")]
    Network(String),
    #[error("refresh endpoint returned unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("refresh response was not in the expected shape: {0}")]
    BadResponse(String),
}

/// Seam between the coordinator and the wire, injectable for tests.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self) -> Result<RefreshOutcome, TransportError>;
}

/// Production transport: POST to the refresh endpoint with cookies included
/// and a hard timeout. Timeout counts as a transient failure.
pub struct HttpRefreshTransport {
    client: reqwest::Client,
    refresh_url: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponseBody {
    user: SessionUser,
}

impl HttpRefreshTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            // Refresh authenticates via the httpOnly cookie, so the jar is required
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            refresh_url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self) -> Result<RefreshOutcome, TransportError> {
        let response = self
            .client
            .post(&self.refresh_url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(RefreshOutcome::Denied);
        }

        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;

        // Accept both enveloped ({"success":true,"data":{"user":...}}) and
        // bare ({"user":...}) response shapes.
        let payload = body.get("data").cloned().unwrap_or(body);
        let parsed: RefreshResponseBody = serde_json::from_value(payload)
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;

        Ok(RefreshOutcome::Refreshed(parsed.user))
    }
}

/// Timer-driven refresh loop with an explicit start/stop lifecycle.
pub struct RefreshCoordinator {
    transport: Arc<dyn RefreshTransport>,
    session: Arc<RwLock<Option<SessionUser>>>,
    interval: Duration,
    in_flight: AtomicBool,
    /// Bumped on start/stop; an in-flight refresh only applies its result
    /// if the generation it captured is still current, so a late response
    /// cannot resurrect a torn-down session.
    generation: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Notified exactly once per forced logout (definitive 401).
    pub logged_out: Notify,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn RefreshTransport>, interval: Duration) -> Self {
        Self {
            transport,
            session: Arc::new(RwLock::new(None)),
            interval,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            timer: Mutex::new(None),
            logged_out: Notify::new(),
        }
    }

    /// Coordinator over the HTTP transport, with the interval and request
    /// timeout taken from `security.refresh_interval_minutes` and
    /// `security.refresh_timeout_secs`.
    pub fn from_config(
        config: &crate::config::AppConfig,
        base_url: &str,
    ) -> Result<Arc<Self>, TransportError> {
        let transport = HttpRefreshTransport::new(
            base_url,
            Duration::from_secs(config.security.refresh_timeout_secs),
        )?;
        Ok(Arc::new(Self::new(
            Arc::new(transport),
            Duration::from_secs(config.security.refresh_interval_minutes * 60),
        )))
    }

    /// Set on login; the coordinator only runs while a session exists.
    pub fn set_session(&self, user: SessionUser) {
        *self.session.write().expect("session lock poisoned") = Some(user);
    }

    pub fn session(&self) -> Option<SessionUser> {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// Begin the keep-alive loop: one immediate attempt (the current token
    /// may already be near expiry), then one attempt per interval.
    /// Restarting replaces any previously scheduled timer.
    pub fn start(self: &Arc<Self>) {
        if self.session().is_none() {
            tracing::debug!("refresh coordinator not started: no session");
            return;
        }

        self.generation.fetch_add(1, Ordering::SeqCst);

        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            coordinator.refresh().await;
            let mut ticker = tokio::time::interval(coordinator.interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                coordinator.refresh().await;
            }
        });

        let mut timer = self.timer.lock().expect("timer lock poisoned");
        if let Some(old) = timer.replace(handle) {
            old.abort();
        }
    }

    /// Cancel future attempts. Never aborts an in-flight call; the
    /// generation bump makes any late result a no-op.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut timer = self.timer.lock().expect("timer lock poisoned");
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    /// Run one refresh attempt.
    ///
    /// Returns `true` when the session is (or is being) kept alive: either
    /// this call succeeded, or another call was already in flight and will
    /// settle the outcome. Returns `false` on any failure; only a 401
    /// clears the session.
    pub async fn refresh(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);

        // Collapse concurrent triggers (timer tick + manual call)
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("refresh already in flight, collapsing trigger");
            return true;
        }

        let _guard = InFlightGuard(&self.in_flight);

        match self.transport.refresh().await {
            Ok(RefreshOutcome::Refreshed(user)) => {
                if self.generation.load(Ordering::SeqCst) == generation {
                    tracing::debug!(user = %user.id, "session refreshed");
                    *self.session.write().expect("session lock poisoned") = Some(user);
                } else {
                    tracing::debug!("discarding stale refresh result");
                }
                true
            }
            Ok(RefreshOutcome::Denied) => {
                // The only path that forces logout
                if self.generation.load(Ordering::SeqCst) == generation {
                    tracing::info!("refresh denied, clearing session");
                    *self.session.write().expect("session lock poisoned") = None;
                    self.logged_out.notify_waiters();
                }
                false
            }
            Err(e) => {
                // Transient: keep the session, the next tick retries
                tracing::warn!(error = %e, "refresh attempt failed, will retry");
                false
            }
        }
    }
}

/// Clears the in-flight flag on every exit path so a failed attempt can
/// never permanently block future ones.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
