//! Pure domain rules for the project-management backend.
//!
//! Nothing in this crate performs I/O. The persistence and HTTP layers call
//! into these modules to decide what to write and who may write it.

pub mod audit;
pub mod error;
pub mod expense;
pub mod knowledge;
pub mod lifecycle;
pub mod lockout;
pub mod numbering;
pub mod pagination;
pub mod policy;
pub mod roles;
pub mod task;
pub mod types;
pub mod validation;
