mod common;

use anyhow::Result;
use axum::body::Body;
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{middleware::from_fn, Extension, Json, Router};
use serde_json::{json, Value};

use zapagent_api::auth::permission::has_permission;
use zapagent_api::auth::Role;
use zapagent_api::error::ApiError;
use zapagent_api::middleware::auth::AuthUser;
use zapagent_api::middleware::{require_admin_middleware, require_auth_middleware};

// An ownership-guarded resource route, shaped like the panel's agent
// endpoints: readable by the owner or by an admin.
async fn agent_get(
    Extension(user): Extension<AuthUser>,
    Path(owner_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !has_permission(&user.id, &owner_id, user.role) {
        return Err(ApiError::acesso_negado());
    }
    Ok(Json(json!({ "success": true, "data": { "owner": owner_id } })))
}

async fn admin_ping() -> Json<Value> {
    Json(json!({ "success": true }))
}

fn guarded_app() -> Router {
    let state = common::test_state();

    let admin_routes = Router::new()
        .route("/api/admin/ping", get(admin_ping))
        .route_layer(from_fn(require_admin_middleware));

    Router::new()
        .route("/api/agents/:owner_id", get(agent_get))
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth_middleware))
        .with_state(state)
}

#[tokio::test]
async fn owner_reads_own_resource() -> Result<()> {
    let token = common::issue_token("alice", Role::User, 3600);

    let res = common::send(
        guarded_app(),
        Request::get("/api/agents/alice")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())?,
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn user_cannot_read_anothers_resource() -> Result<()> {
    let token = common::issue_token("alice", Role::User, 3600);

    let res = common::send(
        guarded_app(),
        Request::get("/api/agents/bob")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())?,
    )
    .await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = common::body_json(res).await;
    assert_eq!(body["error"], "Acesso negado");
    Ok(())
}

#[tokio::test]
async fn admin_reads_anothers_resource() -> Result<()> {
    let token = common::issue_token("root", Role::Admin, 3600);

    let res = common::send(
        guarded_app(),
        Request::get("/api/agents/bob")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())?,
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_route_rejects_regular_user() -> Result<()> {
    let user_token = common::issue_token("alice", Role::User, 3600);
    let admin_token = common::issue_token("root", Role::Admin, 3600);

    let res = common::send(
        guarded_app(),
        Request::get("/api/admin/ping")
            .header("authorization", format!("Bearer {}", user_token))
            .body(Body::empty())?,
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = common::send(
        guarded_app(),
        Request::get("/api/admin/ping")
            .header("authorization", format!("Bearer {}", admin_token))
            .body(Body::empty())?,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_route_without_identity_is_unauthorized() -> Result<()> {
    let res = common::send(
        guarded_app(),
        Request::get("/api/admin/ping").body(Body::empty())?,
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
