use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    /// Period of the expired-window sweep for the in-memory limiter table.
    pub sweep_period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    /// Session token lifetime.
    pub token_ttl_minutes: i64,
    /// Lifetime of the httpOnly refresh token cookie.
    pub refresh_token_ttl_days: i64,
    /// Client auto-refresh period; kept well inside the token lifetime.
    pub refresh_interval_minutes: u64,
    /// Timeout for the refresh network call; overruns count as transient.
    pub refresh_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment presets first, specific env vars override
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_SWEEP_SECS") {
            self.api.sweep_period_secs = v.parse().unwrap_or(self.api.sweep_period_secs);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_TTL_MINUTES") {
            self.security.token_ttl_minutes = v.parse().unwrap_or(self.security.token_ttl_minutes);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_TTL_DAYS") {
            self.security.refresh_token_ttl_days =
                v.parse().unwrap_or(self.security.refresh_token_ttl_days);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_INTERVAL_MINUTES") {
            self.security.refresh_interval_minutes =
                v.parse().unwrap_or(self.security.refresh_interval_minutes);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TIMEOUT_SECS") {
            self.security.refresh_timeout_secs =
                v.parse().unwrap_or(self.security.refresh_timeout_secs);
        }

        if self.environment == Environment::Production && self.security.jwt_secret.is_empty() {
            panic!("JWT_SECRET must be set in production");
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                enable_rate_limiting: false,
                sweep_period_secs: 300,
            },
            security: SecurityConfig {
                jwt_secret: "dev-only-secret-change-me".to_string(),
                token_ttl_minutes: 60,
                refresh_token_ttl_days: 30,
                refresh_interval_minutes: 45,
                refresh_timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                enable_rate_limiting: true,
                sweep_period_secs: 300,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_ttl_minutes: 60,
                refresh_token_ttl_days: 30,
                refresh_interval_minutes: 45,
                refresh_timeout_secs: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                enable_rate_limiting: true,
                sweep_period_secs: 300,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_ttl_minutes: 60,
                refresh_token_ttl_days: 30,
                refresh_interval_minutes: 45,
                refresh_timeout_secs: 10,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
