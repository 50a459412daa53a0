/// Request validation and middleware tests
///
/// These tests exercise routing, the auth middleware, request validation,
/// and single-purpose token checks. None of them need a running database:
/// every request is rejected before a query is made, except the health
/// check which deliberately tolerates a dead pool.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use marketbrief_shared::auth::jwt::{create_token, Claims, TokenType};
use serde_json::json;
use tower::Service as _;
use uuid::Uuid;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).into_owned()
}

fn mint_token(token_type: TokenType) -> String {
    let claims = Claims::new(Uuid::new_v4(), token_type);
    create_token(&claims, common::TEST_JWT_SECRET).unwrap()
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "disconnected");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    // HSTS only applies in production mode
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_permissive_cors_preflight() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/v1/stocks")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_protected_route_requires_credentials() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/portfolio")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Missing credentials");
}

#[tokio::test]
async fn test_protected_route_rejects_non_bearer_scheme() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/portfolio")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Expected Bearer token");
}

#[tokio::test]
async fn test_protected_route_rejects_garbage_token() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/portfolio")
        .header("authorization", "Bearer not-a-real-token")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_on_protected_route() {
    let mut app = common::offline_app();
    let token = mint_token(TokenType::Refresh);

    let request = Request::builder()
        .method("GET")
        .uri("/v1/portfolio")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Not an access token");
}

#[tokio::test]
async fn test_register_rejects_password_mismatch() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "mismatch@example.com",
                "password": "Str0ng-password",
                "confirm_password": "Different-password1!",
                "provider_api_key": "demo-key"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "Passwords do not match");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "weak@example.com",
                "password": "alllowercase1!",
                "confirm_password": "alllowercase1!",
                "provider_api_key": "demo-key"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["details"][0]["field"], "password");
    assert_eq!(
        json["details"][0]["message"],
        "Password must contain at least one uppercase letter"
    );
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "not-an-email",
                "password": "Str0ng-password",
                "confirm_password": "Str0ng-password",
                "provider_api_key": "demo-key"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_stock_search_rejects_bad_params() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/stocks?keywords=%20&offset=-1&limit=500")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    let fields: Vec<&str> = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["keywords", "offset", "limit"]);
}

#[tokio::test]
async fn test_stock_search_rejects_zero_limit() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/stocks?limit=0")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["details"][0]["field"], "limit");
    assert_eq!(json["details"][0]["message"], "limit must be between 1 and 100");
}

#[tokio::test]
async fn test_verify_email_rejects_invalid_token() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/auth/verify-email?token=garbage")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_verify_email_rejects_wrong_purpose_token() {
    let mut app = common::offline_app();
    let token = mint_token(TokenType::Access);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/auth/verify-email?token={}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_reset_password_rejects_wrong_purpose_token() {
    let mut app = common::offline_app();
    let token = mint_token(TokenType::EmailVerification);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/reset-password")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "token": token,
                "new_password": "Str0ng-password"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_confirm_deletion_rejects_wrong_purpose_token() {
    let mut app = common::offline_app();
    let token = mint_token(TokenType::Access);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/account/confirm?token={}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_refresh_rejects_invalid_token() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/refresh")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "refresh_token": "junk" }).to_string(),
        ))
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let mut app = common::offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/does-not-exist")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
