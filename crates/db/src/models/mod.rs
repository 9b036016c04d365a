//! Row models and DTOs, one module per table group.

pub mod contract;
pub mod document;
pub mod expense;
pub mod knowledge;
pub mod operation_log;
pub mod project;
pub mod role;
pub mod task;
pub mod user;
