//! CLI command implementations.

pub mod auth;
pub mod category;
pub mod health;
pub mod project;
pub mod task;
pub mod user;
