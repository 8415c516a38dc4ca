mod logout;
mod refresh;

pub use logout::logout_post;
pub use refresh::refresh_post;

use crate::config::{config, Environment};

/// Build a Set-Cookie value with the attributes used for all session
/// cookies. `max_age_secs <= 0` produces a removal cookie.
pub(crate) fn session_cookie(name: &str, value: &str, path: &str, max_age_secs: i64) -> String {
    let secure = if config().environment == Environment::Production {
        "; Secure"
    } else {
        ""
    };

    format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax{}",
        name,
        value,
        path,
        max_age_secs.max(0),
        secure
    )
}

/// Removal cookie: empty value, Max-Age=0.
pub(crate) fn expired_cookie(name: &str, path: &str) -> String {
    session_cookie(name, "", path, 0)
}

/// The refresh cookie is scoped to the refresh endpoint only.
pub(crate) const REFRESH_COOKIE_PATH: &str = "/auth/refresh";
