//! Integration tests for expense import reconciliation.

use chrono::NaiveDate;
use sqlx::PgPool;
use projectflow_db::models::expense::{ExpenseQuery, ImportedExpense};
use projectflow_db::models::user::CreateUser;
use projectflow_db::repositories::{ExpenseRepo, RoleRepo, UserRepo};
use projectflow_core::pagination::PageRequest;

async fn seed_user(pool: &PgPool) -> i64 {
    let role = RoleRepo::find_by_code(pool, "admin").await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: "finance".to_string(),
            password_hash: "x".to_string(),
            name: "Finance".to_string(),
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

fn row(document_no: &str, amount: f64) -> ImportedExpense {
    ImportedExpense {
        document_no: document_no.to_string(),
        project_id: None,
        expense_type: "direct".to_string(),
        amount,
        expense_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        description: None,
        remark: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reimport_updates_instead_of_inserting(pool: PgPool) {
    let user = seed_user(&pool).await;
    let rows = vec![row("BX-001", 10.0), row("BX-002", 20.0)];

    let first = ExpenseRepo::import_rows(&pool, &rows, user, "march.xlsx").await.unwrap();
    assert_eq!((first.inserted, first.updated), (2, 0));

    let changed = vec![row("BX-001", 15.0), row("BX-002", 20.0)];
    let second = ExpenseRepo::import_rows(&pool, &changed, user, "march.xlsx").await.unwrap();
    assert_eq!((second.inserted, second.updated), (0, 2));

    let query = ExpenseQuery::default();
    assert_eq!(ExpenseRepo::count(&pool, &query).await.unwrap(), 2);
    let list = ExpenseRepo::list(&pool, &query, &PageRequest::default()).await.unwrap();
    let bx1 = list
        .iter()
        .find(|e| e.document_no.as_deref() == Some("BX-001"))
        .unwrap();
    assert_eq!(bx1.amount, 15.0);
    assert_eq!(bx1.source, "import");
    assert!(!bx1.is_classified, "rows without a project stay unclassified");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn totals_group_by_type(pool: PgPool) {
    let user = seed_user(&pool).await;
    let mut labor = row("BX-010", 5.0);
    labor.expense_type = "labor".to_string();
    let rows = vec![row("BX-011", 1.5), row("BX-012", 2.5), labor];
    ExpenseRepo::import_rows(&pool, &rows, user, "april.xlsx").await.unwrap();

    let totals = ExpenseRepo::totals_by_type(&pool, None).await.unwrap();
    let summary: Vec<(&str, f64)> = totals
        .iter()
        .map(|t| (t.expense_type.as_str(), t.total))
        .collect();
    assert_eq!(summary, vec![("direct", 4.0), ("labor", 5.0)]);
}
