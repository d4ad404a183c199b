use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use settings_api::identity::{ClerkClient, IdentityError, UserDirectory};
use std::time::Duration;
use tokio::net::TcpListener;

// --- Fake Clerk Backend API ---

const SECRET_KEY: &str = "sk_test_fake";

/// Serves `/v1/users/{id}` and `/v1/jwks` like Clerk does, after `delay`.
async fn spawn_fake_clerk(delay: Duration) -> String {
    let app = Router::new()
        .route("/v1/users/{id}", get(fake_user))
        .route("/v1/jwks", get(fake_jwks))
        .with_state(delay);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/v1")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {SECRET_KEY}").as_str())
}

async fn fake_user(
    State(delay): State<Duration>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    tokio::time::sleep(delay).await;

    match id.as_str() {
        "user_admin" => Json(json!({
            "id": "user_admin",
            "banned": false,
            "public_metadata": { "role": "admin" }
        }))
        .into_response(),
        "user_banned" => Json(json!({
            "id": "user_banned",
            "banned": true,
            "public_metadata": {}
        }))
        .into_response(),
        "user_broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "errors": [{ "code": "resource_not_found" }] })),
        )
            .into_response(),
    }
}

async fn fake_jwks(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "keys": [{
            "kty": "oct",
            "kid": "ins_test",
            "alg": "HS256",
            "k": "andrcy10ZXN0LXNpZ25pbmctc2VjcmV0LTAxMjM0NTY3"
        }]
    }))
    .into_response()
}

fn client(base_url: &str, secret: &str, timeout: Duration) -> ClerkClient {
    ClerkClient::new(base_url, secret.to_string(), timeout).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_get_user_reads_role_and_banned_flag() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, SECRET_KEY, Duration::from_secs(5));

    let admin = clerk.get_user("user_admin").await.unwrap();
    assert!(admin.is_admin());
    assert!(!admin.banned);

    let banned = clerk.get_user("user_banned").await.unwrap();
    assert!(banned.banned);
    assert!(!banned.is_admin());
}

#[tokio::test]
async fn test_get_user_not_found() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, SECRET_KEY, Duration::from_secs(5));

    let result = clerk.get_user("user_missing").await;

    assert!(matches!(result, Err(IdentityError::UserNotFound(id)) if id == "user_missing"));
}

#[tokio::test]
async fn test_get_user_upstream_error_status() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, SECRET_KEY, Duration::from_secs(5));

    let result = clerk.get_user("user_broken").await;

    assert!(matches!(result, Err(IdentityError::Status(500))));
}

#[tokio::test]
async fn test_get_user_with_wrong_secret() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, "sk_test_wrong", Duration::from_secs(5));

    let result = clerk.get_user("user_admin").await;

    assert!(matches!(result, Err(IdentityError::Status(401))));
}

#[tokio::test]
async fn test_get_user_times_out() {
    let base = spawn_fake_clerk(Duration::from_secs(2)).await;
    let clerk = client(&base, SECRET_KEY, Duration::from_millis(100));

    let result = clerk.get_user("user_admin").await;

    assert!(matches!(result, Err(IdentityError::Timeout)));
}

#[tokio::test]
async fn test_get_user_refuses_unsafe_ids() {
    // Nothing listens here; the id must be refused before any request.
    let clerk = client("http://127.0.0.1:9/v1", SECRET_KEY, Duration::from_secs(5));

    let result = clerk.get_user("../jwks").await;

    assert!(matches!(result, Err(IdentityError::InvalidUserId(_))));
}

#[tokio::test]
async fn test_fetch_jwks_and_build_verifier() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, SECRET_KEY, Duration::from_secs(5));

    let jwks = clerk.fetch_jwks().await.unwrap();
    assert_eq!(jwks.keys.len(), 1);

    assert!(clerk.session_verifier(Vec::new()).await.is_ok());
}

#[tokio::test]
async fn test_fetch_jwks_with_wrong_secret() {
    let base = spawn_fake_clerk(Duration::ZERO).await;
    let clerk = client(&base, "sk_test_wrong", Duration::from_secs(5));

    let result = clerk.fetch_jwks().await;

    assert!(matches!(result, Err(IdentityError::Status(401))));
}
