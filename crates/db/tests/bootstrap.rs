use sqlx::PgPool;

/// Full bootstrap: connect, migrate, verify seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    projectflow_db::health_check(&pool).await.unwrap();

    let roles = projectflow_db::repositories::RoleRepo::list(&pool).await.unwrap();
    let codes: Vec<&str> = roles.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["admin", "dept_manager", "team_leader", "team_member"],
        "all four roles should be seeded in id order"
    );

    let categories = projectflow_db::repositories::KnowledgeCategoryRepo::list(&pool)
        .await
        .unwrap();
    assert_eq!(categories.len(), 5, "default knowledge categories should be seeded");
}
