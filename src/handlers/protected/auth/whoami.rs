// GET /api/auth/whoami - current authenticated identity

use axum::{response::Json, Extension};
use serde_json::{json, Value};

use crate::middleware::auth::AuthUser;

/// Echoes the identity resolved by the auth middleware, including which
/// credential source produced it. Fresh per request, never cached.
pub async fn whoami_get(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "id": user.id,
            "email": user.email,
            "full_name": user.name,
            "role": user.role.as_str(),
            "credential_source": user.source.as_str(),
        }
    }))
}
