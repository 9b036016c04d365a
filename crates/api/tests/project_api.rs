//! Project and task workflow scenarios against a real database.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json_auth, put_json_auth};
use sqlx::PgPool;

use projectflow_db::models::user::{CreateUser, User};
use projectflow_db::repositories::{RoleRepo, UserRepo};

async fn create_user(pool: &PgPool, username: &str, role_code: &str) -> User {
    let role = RoleRepo::find_by_code(pool, role_code).await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash: "unused".to_string(),
            name: username.to_string(),
            email: None,
            phone: None,
            department: None,
            role_id: role.id,
        },
    )
    .await
    .unwrap()
}

/// Create a project as `leader` with one task assigned to `assignee`.
async fn create_assigned_task(pool: &PgPool, leader: &User, assignee: &User) -> i64 {
    let token = common::token_for(leader.id, &leader.username, "team_leader");

    let app = common::build_test_app(pool.clone());
    let project = body_json(
        post_json_auth(
            app,
            "/api/v1/projects",
            &token,
            serde_json::json!({ "name": "Cell test", "project_type": "cost" }),
        )
        .await,
    )
    .await;
    let project_id = project["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/tasks",
        &token,
        serde_json::json!({
            "project_id": project_id,
            "task_name": "Write the test report",
            "assignee_id": assignee.id
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_project_starts_in_initiation_with_fixed_phases(pool: PgPool) {
    let leader = create_user(&pool, "lead", "team_leader").await;
    let token = common::token_for(leader.id, "lead", "team_leader");

    let body = serde_json::json!({
        "name": "BMS v2",
        "project_type": "cost",
        "labor_cost": 1000.0
    });
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/projects", &token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let project = &json["data"];
    assert_eq!(project["manager_id"], leader.id);
    assert_eq!(project["current_phase"], "initiation");
    assert!(project["project_no"].as_str().unwrap().starts_with("PRJ"));

    let phases = project["phases"].as_array().unwrap();
    let names: Vec<_> = phases.iter().map(|p| p["phase_name"].as_str().unwrap()).collect();
    assert_eq!(names, ["initiation", "bidding", "contract", "acceptance", "closing"]);
    assert_eq!(phases[0]["status"], "in_progress");
    assert_eq!(phases[1]["status"], "not_started");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_assignee_moves_a_task(pool: PgPool) {
    let leader = create_user(&pool, "lead", "team_leader").await;
    let worker = create_user(&pool, "worker", "team_member").await;
    let other = create_user(&pool, "other", "team_member").await;
    let leader_token = common::token_for(leader.id, "lead", "team_leader");

    let app = common::build_test_app(pool.clone());
    let project = body_json(
        post_json_auth(
            app,
            "/api/v1/projects",
            &leader_token,
            serde_json::json!({ "name": "Pack", "project_type": "capital" }),
        )
        .await,
    )
    .await;
    let project_id = project["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/tasks",
        &leader_token,
        serde_json::json!({
            "project_id": project_id,
            "task_name": "Draft the bid",
            "assignee_id": worker.id
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let status_uri = format!("/api/v1/tasks/{task_id}/status");
    let request = |token: String| {
        axum::http::Request::builder()
            .method(axum::http::Method::PUT)
            .uri(&status_uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::from(r#"{"status":"in_progress"}"#))
            .unwrap()
    };

    let app = common::build_test_app(pool.clone());
    let response = common::send(app, request(common::token_for(other.id, "other", "team_member"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let response = common::send(app, request(common::token_for(worker.id, "worker", "team_member"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let mine = body_json(
        get_auth(app, "/api/v1/tasks/my", &common::token_for(worker.id, "worker", "team_member")).await,
    )
    .await;
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["data"][0]["status"], "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_cannot_move_someone_elses_task(pool: PgPool) {
    let leader = create_user(&pool, "lead", "team_leader").await;
    let worker = create_user(&pool, "worker", "team_member").await;
    let admin = create_user(&pool, "root", "admin").await;
    let task_id = create_assigned_task(&pool, &leader, &worker).await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/tasks/{task_id}/status"),
        &common::token_for(admin.id, "root", "admin"),
        serde_json::json!({ "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_overrides_the_assignee_status(pool: PgPool) {
    let leader = create_user(&pool, "lead", "team_leader").await;
    let worker = create_user(&pool, "worker", "team_member").await;
    let task_id = create_assigned_task(&pool, &leader, &worker).await;
    let leader_token = common::token_for(leader.id, "lead", "team_leader");
    let review_uri = format!("/api/v1/tasks/{task_id}/review");

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/tasks/{task_id}/status"),
        &common::token_for(worker.id, "worker", "team_member"),
        serde_json::json!({ "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Rejection wins over the assignee's own "completed".
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &review_uri,
        &leader_token,
        serde_json::json!({ "decision": "rejected", "comment": "Missing data" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let task = body_json(response).await["data"].clone();
    assert_eq!(task["status"], "rejected");
    assert_eq!(task["review_status"], "rejected");
    assert_eq!(task["review_comment"], "Missing data");
    assert_eq!(task["reviewed_by"], leader.id);
    assert!(!task["reviewed_at"].is_null());

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &review_uri,
        &leader_token,
        serde_json::json!({ "decision": "approved" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let task = body_json(response).await["data"].clone();
    assert_eq!(task["status"], "completed");
    assert_eq!(task["review_status"], "approved");
    assert!(!task["completed_at"].is_null());

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &review_uri,
        &leader_token,
        serde_json::json!({ "decision": "maybe" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
