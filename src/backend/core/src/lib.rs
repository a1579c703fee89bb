//! # Taskforge Core
//!
//! Project/task tracker with a first-class access-control core.
//!
//! ## Architecture
//!
//! - **Token Service**: two-kind JWT lifecycle (access/refresh) with
//!   distinct signing secrets and a live account gate on refresh
//! - **Access Control Evaluator**: one static decision table interpreted
//!   by a single function; handlers never branch on roles
//! - **Query Scoping**: list visibility applied in SQL, monotonic with
//!   the evaluator
//! - **Mutation Guard**: locate → authorize → validate-references before
//!   any write, failing closed on fact-lookup timeouts
//! - **Observability**: tracing with optional OTLP export plus Prometheus
//!   metrics

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod pagination;
pub mod validation;

pub use error::{ErrorCode, ForgeError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::{Claims, CredentialStore, TokenKind, TokenPair, TokenService};
    pub use crate::authz::{
        evaluate, evaluate_list, visibility, Action, Actor, Decision, DenyReason, FactSource,
        MutationGuard, OwnershipFacts, ProjectFacts, Reference, ResourceKind, Role, Rule, Scope,
        ScopePredicate, TaskFacts, UserFacts,
    };
    pub use crate::db::{Database, TaskStatus};
    pub use crate::error::{ErrorCode, ForgeError, Result};
    pub use crate::pagination::{OffsetPagination, PageMetadata};
}
