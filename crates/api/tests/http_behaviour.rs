//! HTTP-level tests that never reach the database: routing, middleware,
//! authentication and role gates.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, get_auth, post_json_auth, token_for, unreachable_pool};

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let app = common::build_test_app(unreachable_pool());
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(unreachable_pool());
    let response = get(app, "/api/v1/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = common::build_test_app(unreachable_pool());
    let response = get(app, "/api/v1/projects").await;

    let id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap();
    assert_eq!(id.len(), 36, "request id should be a UUID");
}

#[tokio::test]
async fn missing_token_is_rejected_with_401() {
    let app = common::build_test_app(unreachable_pool());
    let response = get(app, "/api/v1/projects").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_rejected_with_401() {
    let app = common::build_test_app(unreachable_pool());
    let response = get_auth(app, "/api/v1/tasks/my", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_with_unknown_role_is_rejected() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(9, "ghost", "superuser");
    let response = get_auth(app, "/api/v1/projects", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logs_require_a_management_role() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(7, "member", "team_member");
    let response = get_auth(app, "/api/v1/logs", &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn log_vocabulary_is_served_to_managers() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(2, "manager", "dept_manager");
    let response = get_auth(app, "/api/v1/logs/modules", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let modules = json["data"].as_array().expect("module list");
    assert!(modules.iter().any(|m| m["value"] == "expense"));
}

#[tokio::test]
async fn log_access_follows_the_policy_for_every_role() {
    let cases = [
        ("admin", StatusCode::OK),
        ("dept_manager", StatusCode::OK),
        ("team_leader", StatusCode::FORBIDDEN),
        ("team_member", StatusCode::FORBIDDEN),
    ];
    for (role, expected) in cases {
        let app = common::build_test_app(unreachable_pool());
        let token = token_for(9, "someone", role);
        let response = get_auth(app, "/api/v1/logs/actions", &token).await;
        assert_eq!(response.status(), expected, "role {role}");
    }
}

#[tokio::test]
async fn team_leader_cannot_create_users() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(3, "leader", "team_leader");
    let body = serde_json::json!({
        "username": "newcomer",
        "password": "Strong@123",
        "name": "New Comer",
        "role_id": 4
    });
    let response = post_json_auth(app, "/api/v1/users", &token, body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn team_member_cannot_create_projects() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(4, "member", "team_member");
    let body = serde_json::json!({ "name": "Pack line", "project_type": "cost" });
    let response = post_json_auth(app, "/api/v1/projects", &token, body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expense_import_is_limited_to_management() {
    let app = common::build_test_app(unreachable_pool());
    let token = token_for(5, "leader", "team_leader");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/expenses/import")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from("--XBOUNDARY--\r\n"))
        .unwrap();

    let response = common::send(app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cors_preflight_allows_the_configured_origin() {
    let app = common::build_test_app(unreachable_pool());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/projects")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .body(Body::empty())
        .unwrap();

    let response = common::send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
}
