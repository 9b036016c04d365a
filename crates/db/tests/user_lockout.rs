//! Integration tests for failed-login bookkeeping.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use projectflow_db::models::user::CreateUser;
use projectflow_db::repositories::{RoleRepo, UserRepo};

#[sqlx::test(migrations = "../../db/migrations")]
async fn fifth_failure_sets_lock_and_success_clears_it(pool: PgPool) {
    let role = RoleRepo::find_by_code(&pool, "team_member").await.unwrap().unwrap();
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "alice".to_string(),
            password_hash: "x".to_string(),
            name: "Alice".to_string(),
            email: None,
            phone: None,
            department: None,
            role_id: role.id,
        },
    )
    .await
    .unwrap();

    let lock_until = Utc::now() + Duration::minutes(30);
    for attempt in 1..=4 {
        let (count, locked) = UserRepo::record_failed_login(&pool, user.id, 5, lock_until)
            .await
            .unwrap();
        assert_eq!(count, attempt);
        assert!(locked.is_none(), "attempt {attempt} must not lock");
    }

    let (count, locked) = UserRepo::record_failed_login(&pool, user.id, 5, lock_until)
        .await
        .unwrap();
    assert_eq!(count, 5);
    assert!(locked.is_some(), "fifth failure locks the account");

    // Counter survives an expired lock, so the next failure re-locks.
    let relock = Utc::now() + Duration::minutes(60);
    let (count, locked) = UserRepo::record_failed_login(&pool, user.id, 5, relock)
        .await
        .unwrap();
    assert_eq!(count, 6);
    assert_eq!(
        locked.map(|t| t.timestamp()),
        Some(relock.timestamp()),
        "failure after the window re-locks"
    );

    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    let reloaded = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_login_count, 0);
    assert!(reloaded.locked_until.is_none());
    assert!(reloaded.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_username_can_be_reused(pool: PgPool) {
    let role = RoleRepo::find_by_code(&pool, "team_member").await.unwrap().unwrap();
    let input = CreateUser {
        username: "bob".to_string(),
        password_hash: "x".to_string(),
        name: "Bob".to_string(),
        email: None,
        phone: None,
        department: None,
        role_id: role.id,
    };
    let first = UserRepo::create(&pool, &input).await.unwrap();
    assert!(UserRepo::create(&pool, &input).await.is_err(), "live duplicate rejected");

    assert!(UserRepo::soft_delete(&pool, first.id).await.unwrap());
    assert!(UserRepo::find_by_username(&pool, "bob").await.unwrap().is_none());
    UserRepo::create(&pool, &input).await.unwrap();
}
