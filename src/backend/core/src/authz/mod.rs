//! Access-control core: the decision table, query scoping, and the
//! mutation guard that sequences locate → authorize → validate-references
//! for every write.

pub mod guard;
pub mod model;
pub mod policy;
pub mod scope;

pub use guard::{FactSource, MutationGuard, Reference};
pub use model::{
    Action, Actor, OwnershipFacts, ProjectFacts, ResourceKind, Role, TaskFacts, UserFacts,
};
pub use policy::{evaluate, evaluate_list, rule_for, Decision, DenyReason, Rule};
pub use scope::{permits_project, permits_task, visibility, Scope, ScopePredicate};
