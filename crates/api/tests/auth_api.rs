//! Login, lockout and role-gate scenarios against a real database.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json, post_json_auth};
use sqlx::PgPool;

use projectflow_api::auth::password::hash_password;
use projectflow_db::models::user::{CreateUser, User};
use projectflow_db::repositories::{RoleRepo, UserRepo};

const PASSWORD: &str = "Secret@123";

async fn create_user(pool: &PgPool, username: &str, role_code: &str) -> User {
    let role = RoleRepo::find_by_code(pool, role_code)
        .await
        .unwrap()
        .expect("role is seeded by migrations");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
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

async fn login(pool: &PgPool, username: &str, password: &str) -> axum::http::Response<axum::body::Body> {
    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({ "username": username, "password": password });
    post_json(app, "/api/v1/auth/login", body).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_token_and_profile(pool: PgPool) {
    let user = create_user(&pool, "alice", "team_leader").await;

    let response = login(&pool, "alice", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["id"], user.id);
    assert_eq!(json["data"]["user"]["role_code"], "team_leader");

    let token = json["data"]["token"].as_str().unwrap().to_string();
    let app = common::build_test_app(pool.clone());
    let me = body_json(get_auth(app, "/api/v1/auth/me", &token).await).await;
    assert_eq!(me["data"]["username"], "alice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_user_and_wrong_password_look_the_same(pool: PgPool) {
    create_user(&pool, "bob", "team_member").await;

    let unknown = login(&pool, "nobody", PASSWORD).await;
    let wrong = login(&pool, "bob", "Wrong@123").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(unknown).await["message"], body_json(wrong).await["message"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn five_failures_lock_the_account(pool: PgPool) {
    create_user(&pool, "carol", "team_member").await;

    for _ in 0..5 {
        let response = login(&pool, "carol", "Wrong@123").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Locked: even the right password is refused, with 403.
    let response = login(&pool, "carol", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_user_with_strong_password_only(pool: PgPool) {
    let admin = create_user(&pool, "root", "admin").await;
    let member_role = RoleRepo::find_by_code(&pool, "team_member").await.unwrap().unwrap();
    let token = common::token_for(admin.id, "root", "admin");

    let weak = serde_json::json!({
        "username": "dave", "password": "password", "name": "Dave", "role_id": member_role.id
    });
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/users", &token, weak).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let strong = serde_json::json!({
        "username": "dave", "password": "Strong@123", "name": "Dave", "role_id": member_role.id
    });
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/users", &token, strong.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/users", &token, strong).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
