//! Repositories, one per table group.
//!
//! Each repository is a zero-sized struct whose associated functions take a
//! `&PgPool` and return plain `sqlx` results. Multi-statement writes run in
//! a transaction opened inside the repository.

pub mod contract_repo;
pub mod document_repo;
pub mod expense_repo;
pub mod knowledge_repo;
pub mod member_repo;
pub mod operation_log_repo;
pub mod phase_repo;
pub mod project_repo;
pub mod role_repo;
pub mod task_repo;
pub mod user_repo;

pub use contract_repo::ContractRepo;
pub use document_repo::DocumentRepo;
pub use expense_repo::ExpenseRepo;
pub use knowledge_repo::{KnowledgeCategoryRepo, KnowledgeRepo};
pub use member_repo::MemberRepo;
pub use operation_log_repo::OperationLogRepo;
pub use phase_repo::PhaseRepo;
pub use project_repo::ProjectRepo;
pub use role_repo::RoleRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
