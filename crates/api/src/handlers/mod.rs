pub mod auth;
pub mod contract;
pub mod document;
pub mod expense;
pub mod knowledge;
pub mod log;
pub mod project;
pub mod task;
pub mod user;
