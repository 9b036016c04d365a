//! Integration tests for project creation and the phase cascade.

use assert_matches::assert_matches;
use sqlx::PgPool;
use projectflow_core::error::CoreError;
use projectflow_db::error::RepoError;
use projectflow_db::models::project::CreateProject;
use projectflow_db::models::user::CreateUser;
use projectflow_db::repositories::{MemberRepo, PhaseRepo, ProjectRepo, RoleRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, username: &str) -> i64 {
    let role = RoleRepo::find_by_code(pool, "team_leader")
        .await
        .unwrap()
        .expect("seeded role");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            name: username.to_string(),
            email: None,
            phone: None,
            department: None,
            role_id: role.id,
        },
    )
    .await
    .unwrap()
    .id
}

fn new_project(no: &str, manager_id: i64) -> CreateProject {
    CreateProject {
        project_no: no.to_string(),
        name: "Pack line upgrade".to_string(),
        project_type: "cost".to_string(),
        manager_id,
        created_by: manager_id,
        contract_no: None,
        budget_code: None,
        innovation_code: None,
        initiation_date: None,
        closing_date: None,
        labor_cost: 1000.0,
        direct_cost: 0.0,
        outsourcing_cost: 0.0,
        other_cost: 0.0,
    }
}

async fn phase_id(pool: &PgPool, project_id: i64, name: &str) -> i64 {
    PhaseRepo::list_for_project(pool, project_id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.phase_name == name)
        .unwrap_or_else(|| panic!("phase {name} should exist"))
        .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_project_seeds_fixed_phases_and_manager(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-1", manager))
        .await
        .unwrap();

    assert_eq!(project.status, "in_progress");
    assert_eq!(project.current_phase, "initiation");

    let phases = PhaseRepo::list_for_project(&pool, project.id).await.unwrap();
    let summary: Vec<(&str, i32, &str)> = phases
        .iter()
        .map(|p| (p.phase_name.as_str(), p.phase_order, p.status.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("initiation", 1, "in_progress"),
            ("bidding", 2, "not_started"),
            ("contract", 3, "not_started"),
            ("acceptance", 100, "not_started"),
            ("closing", 101, "not_started"),
        ]
    );
    assert!(phases[0].start_date.is_some(), "initiation start should be stamped");
    assert!(phases.iter().all(|p| p.is_fixed));

    assert!(MemberRepo::is_member(&pool, project.id, manager).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_project_number_is_rejected(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    ProjectRepo::create_with_phases(&pool, &new_project("PRJ-DUP", manager))
        .await
        .unwrap();
    let err = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-DUP", manager))
        .await
        .unwrap_err();
    let constraint = err
        .as_database_error()
        .and_then(|e| e.constraint())
        .map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("uq_projects_project_no"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_a_phase_activates_the_next_one(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-2", manager))
        .await
        .unwrap();
    let initiation = phase_id(&pool, project.id, "initiation").await;

    let outcome = PhaseRepo::apply_status_change(&pool, project.id, initiation, "completed", None)
        .await
        .unwrap()
        .expect("phase exists");

    assert_eq!(outcome.phase.status, "completed");
    assert!(outcome.phase.completed_at.is_some());
    let activated = outcome.activated.expect("bidding should be activated");
    assert_eq!(activated.phase_name, "bidding");
    assert_eq!(activated.status, "in_progress");
    assert!(activated.start_date.is_some());
    assert_eq!(outcome.project.current_phase, "bidding");
    assert_eq!(outcome.project.status, "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_the_last_phase_completes_the_project(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-3", manager))
        .await
        .unwrap();
    let closing = phase_id(&pool, project.id, "closing").await;

    let outcome = PhaseRepo::apply_status_change(&pool, project.id, closing, "completed", None)
        .await
        .unwrap()
        .expect("phase exists");

    assert!(outcome.activated.is_none());
    assert_eq!(outcome.project.status, "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn custom_phases_follow_contract_and_end_the_project(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-4", manager))
        .await
        .unwrap();

    let first = PhaseRepo::add_custom(&pool, project.id, "prototype", None).await.unwrap();
    let second = PhaseRepo::add_custom(&pool, project.id, "pilot", None).await.unwrap();
    assert_eq!(first.phase_order, 4);
    assert_eq!(second.phase_order, 5);
    assert!(!first.is_fixed);
    assert_eq!(first.status, "not_started");

    // Completing the contract phase hands over to the first custom phase.
    let contract = phase_id(&pool, project.id, "contract").await;
    let outcome = PhaseRepo::apply_status_change(&pool, project.id, contract, "completed", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.project.current_phase, "prototype");

    let outcome = PhaseRepo::apply_status_change(&pool, project.id, second.id, "completed", None)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.activated.is_none(), "acceptance is not order 6");
    assert_eq!(outcome.project.status, "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_contract_without_custom_phases_completes_the_project(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-6", manager))
        .await
        .unwrap();
    let contract = phase_id(&pool, project.id, "contract").await;

    let outcome = PhaseRepo::apply_status_change(&pool, project.id, contract, "completed", None)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.activated.is_none());
    assert_eq!(outcome.project.status, "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_custom_phase_leaves_a_gap_that_ends_the_cascade(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-7", manager))
        .await
        .unwrap();
    let first = PhaseRepo::add_custom(&pool, project.id, "a", None).await.unwrap();
    let middle = PhaseRepo::add_custom(&pool, project.id, "b", None).await.unwrap();
    let last = PhaseRepo::add_custom(&pool, project.id, "c", None).await.unwrap();
    assert_eq!((first.phase_order, last.phase_order), (4, 6));
    assert!(PhaseRepo::delete(&pool, project.id, middle.id).await.unwrap());

    let outcome = PhaseRepo::apply_status_change(&pool, project.id, first.id, "completed", None)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.activated.is_none());
    assert_eq!(outcome.project.status, "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fixed_phase_cannot_be_deleted(pool: PgPool) {
    let manager = seed_user(&pool, "lead").await;
    let project = ProjectRepo::create_with_phases(&pool, &new_project("PRJ-5", manager))
        .await
        .unwrap();
    let bidding = phase_id(&pool, project.id, "bidding").await;

    let err = PhaseRepo::delete(&pool, project.id, bidding).await.unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Validation(_)));

    let custom = PhaseRepo::add_custom(&pool, project.id, "extra", None).await.unwrap();
    assert!(PhaseRepo::delete(&pool, project.id, custom.id).await.unwrap());
}
