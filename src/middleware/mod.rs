pub mod auth;
pub mod rate_limit;

pub use auth::{
    authenticate, require_admin_middleware, require_auth_middleware, AuthUser, CredentialSource,
    LEGACY_USER_COOKIE, REFRESH_COOKIE, SESSION_COOKIE,
};
pub use rate_limit::{auth_rate_limit, read_rate_limit, sensitive_rate_limit, write_rate_limit};
