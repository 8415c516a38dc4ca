use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::auth::{Claims, Role, TokenCodec, TokenKind};
use crate::error::ApiError;
use crate::AppState;

/// Signed session token cookie. Primary cookie credential.
pub const SESSION_COOKIE: &str = "session_token";
/// Plain JSON user cookie. Deprecated fallback, trusted without signature.
pub const LEGACY_USER_COOKIE: &str = "user_data";
/// Opaque httpOnly refresh credential, only read by the refresh endpoint.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Which credential source produced the identity. Legacy is explicitly the
/// lowest-trust variant; call sites can distinguish it statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SignedHeader,
    SignedCookie,
    LegacyUnsigned,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::SignedHeader => "signed_header",
            CredentialSource::SignedCookie => "signed_cookie",
            CredentialSource::LegacyUnsigned => "legacy_unsigned",
        }
    }
}

/// Authenticated user context resolved per request, never cached
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub source: CredentialSource,
}

impl AuthUser {
    fn from_claims(claims: Claims, source: CredentialSource) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            source,
        }
    }
}

/// Shape of the deprecated plain-JSON user cookie.
#[derive(Debug, Deserialize)]
struct LegacyUser {
    id: String,
    email: String,
    #[serde(default)]
    full_name: String,
    role: Role,
}

/// Resolve an identity from the request, trying sources in strict
/// precedence order and stopping at the first success:
///
/// 1. `Authorization: Bearer` header (signed token)
/// 2. `session_token` cookie (signed token)
/// 3. `user_data` cookie (legacy plain JSON, unsigned)
///
/// A failed source logs and falls through; no identity at all is not an
/// error here, callers decide whether identity is required.
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Option<AuthUser> {
    if let Some(token) = bearer_token(headers) {
        if let Some(claims) = verify_session_grade(codec, token, "authorization header") {
            tracing::debug!(user = %claims.sub, "authenticated via bearer header");
            return Some(AuthUser::from_claims(claims, CredentialSource::SignedHeader));
        }
    }

    if let Some(token) = cookie_value(headers, SESSION_COOKIE) {
        if let Some(claims) = verify_session_grade(codec, token, "session cookie") {
            tracing::debug!(user = %claims.sub, "authenticated via session cookie");
            return Some(AuthUser::from_claims(claims, CredentialSource::SignedCookie));
        }
    }

    if let Some(raw) = cookie_value(headers, LEGACY_USER_COOKIE) {
        match parse_legacy_cookie(raw) {
            Some(user) => {
                // Unsigned path, kept only until callers migrate. Always
                // logged so remaining traffic can be tracked down.
                tracing::warn!(user = %user.id, "authenticated via legacy unsigned cookie");
                return Some(user);
            }
            None => tracing::debug!("legacy user cookie present but unparseable"),
        }
    }

    None
}

/// Middleware for the protected tier: resolves an identity, injects it as a
/// request extension, rejects with the canonical 401 when none resolves.
pub async fn require_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user =
        authenticate(&state.codec, request.headers()).ok_or_else(ApiError::nao_autorizado)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Layered after `require_auth_middleware` on admin-only routes.
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(ApiError::nao_autorizado)?;

    if user.role != Role::Admin {
        tracing::debug!(user = %user.id, "admin route denied for non-admin");
        return Err(ApiError::acesso_negado());
    }

    Ok(next.run(request).await)
}

/// Verify a signed token and require session grade. A refresh token is a
/// cookie-only minting credential and must never authenticate a request.
fn verify_session_grade(codec: &TokenCodec, token: &str, source: &str) -> Option<Claims> {
    match codec.verify(token) {
        Ok(claims) if claims.typ == TokenKind::Session => Some(claims),
        Ok(claims) => {
            tracing::warn!(source, user = %claims.sub, "refresh-grade token rejected as request credential");
            None
        }
        Err(e) => {
            log_token_failure(source, &e);
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Pull a single cookie out of the `cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_str = headers.get("cookie")?.to_str().ok()?;

    for pair in cookie_str.split(';') {
        let part = pair.trim();
        if let Some(value) = part.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }

    None
}

fn parse_legacy_cookie(raw: &str) -> Option<AuthUser> {
    let legacy: LegacyUser = serde_json::from_str(raw).ok()?;

    Some(AuthUser {
        id: legacy.id,
        email: legacy.email,
        name: legacy.full_name,
        role: legacy.role,
        source: CredentialSource::LegacyUnsigned,
    })
}

fn log_token_failure(source: &str, err: &crate::auth::TokenError) {
    use crate::auth::TokenError;

    match err {
        // Possible attack signal, elevated severity
        TokenError::InvalidSignature => {
            tracing::warn!(source, "token rejected: invalid signature")
        }
        // Routine; clients refresh and retry
        TokenError::TokenExpired => tracing::debug!(source, "token rejected: expired"),
        other => tracing::debug!(source, error = %other, "token rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec() -> TokenCodec {
        TokenCodec::new("middleware-test-secret")
    }

    fn token_for(codec: &TokenCodec, sub: &str, role: Role, ttl_secs: i64) -> String {
        token_of_kind(codec, sub, role, TokenKind::Session, ttl_secs)
    }

    fn token_of_kind(
        codec: &TokenCodec,
        sub: &str,
        role: Role,
        typ: TokenKind,
        ttl_secs: i64,
    ) -> String {
        let claims = Claims::new(
            sub.into(),
            format!("{}@example.com", sub),
            sub.to_uppercase(),
            role,
            typ,
            Duration::seconds(ttl_secs),
        );
        codec.issue(&claims).unwrap()
    }

    #[test]
    fn header_wins_over_cookie() {
        let codec = codec();
        let header_token = token_for(&codec, "alice", Role::User, 3600);
        let cookie_token = token_for(&codec, "bob", Role::User, 3600);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", header_token).parse().unwrap());
        headers.insert(
            "cookie",
            format!("{}={}", SESSION_COOKIE, cookie_token).parse().unwrap(),
        );

        let user = authenticate(&codec, &headers).unwrap();
        assert_eq!(user.id, "alice");
        assert_eq!(user.source, CredentialSource::SignedHeader);
    }

    #[test]
    fn invalid_header_falls_through_to_cookie() {
        let codec = codec();
        let cookie_token = token_for(&codec, "bob", Role::Admin, 3600);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer not.a.token".parse().unwrap());
        headers.insert(
            "cookie",
            format!("theme=dark; {}={}", SESSION_COOKIE, cookie_token).parse().unwrap(),
        );

        let user = authenticate(&codec, &headers).unwrap();
        assert_eq!(user.id, "bob");
        assert_eq!(user.source, CredentialSource::SignedCookie);
    }

    #[test]
    fn legacy_cookie_is_last_resort() {
        let codec = codec();
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            format!(
                r#"{}={{"id":"u9","email":"u9@example.com","full_name":"U Nine","role":"user"}}"#,
                LEGACY_USER_COOKIE
            )
            .parse()
            .unwrap(),
        );

        let user = authenticate(&codec, &headers).unwrap();
        assert_eq!(user.id, "u9");
        assert_eq!(user.source, CredentialSource::LegacyUnsigned);
    }

    #[test]
    fn expired_token_does_not_grant_access() {
        let codec = codec();
        let expired = token_for(&codec, "alice", Role::User, -60);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", expired).parse().unwrap());

        assert!(authenticate(&codec, &headers).is_none());
    }

    #[test]
    fn refresh_token_does_not_grant_access() {
        let codec = codec();
        let refresh = token_of_kind(&codec, "alice", Role::User, TokenKind::Refresh, 3600);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", refresh).parse().unwrap());
        assert!(authenticate(&codec, &headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            format!("{}={}", SESSION_COOKIE, refresh).parse().unwrap(),
        );
        assert!(authenticate(&codec, &headers).is_none());
    }

    #[test]
    fn no_credentials_yields_none() {
        assert!(authenticate(&codec(), &HeaderMap::new()).is_none());
    }

    #[test]
    fn cookie_value_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "a=1; session_token=tok; b=2".parse().unwrap());

        assert_eq!(cookie_value(&headers, SESSION_COOKIE), Some("tok"));
        assert_eq!(cookie_value(&headers, "a"), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
