//! Authorization data model: actors, roles, actions, resource kinds, and
//! the per-kind ownership-fact projections decisions are made from.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Roles and Actors
// ═══════════════════════════════════════════════════════════════════════════════

/// The closed set of roles. Captured into the token at issuance; a role
/// change takes effect on the next login or refresh, not mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }

    /// Parse a role from its storage/wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity making a call.
///
/// Built once per request from a verified access token; never re-read from
/// storage during the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Kinds and Actions
// ═══════════════════════════════════════════════════════════════════════════════

/// The resource kinds the tracker manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
    Task,
    Category,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Task => "task",
            Self::Category => "category",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an actor can attempt against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    List,
    Update,
    Delete,
    ChangeStatus,
    Upload,
    ChangePassword,
    ChangeRole,
    Deactivate,
    ReadStats,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::List => "list",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ChangeStatus => "change_status",
            Self::Upload => "upload",
            Self::ChangePassword => "change_password",
            Self::ChangeRole => "change_role",
            Self::Deactivate => "deactivate",
            Self::ReadStats => "read_stats",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ownership Facts
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimal relationship projection for a project, fetched per (resource,
/// actor) pair. `actor_is_assigned` is true when the actor holds at least
/// one task assignment inside the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectFacts {
    pub created_by: Uuid,
    pub actor_is_assigned: bool,
}

/// Minimal relationship projection for a task. Project ownership is an
/// explicit input fact, not a graph walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFacts {
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub project_id: Uuid,
    pub project_created_by: Uuid,
}

/// Minimal projection for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserFacts {
    pub id: Uuid,
    pub active: bool,
}

/// The ownership facts an authorization decision is made from.
///
/// Facts are read transiently for the duration of one call and never
/// cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipFacts {
    User(UserFacts),
    Project(ProjectFacts),
    Task(TaskFacts),
    /// Categories are role-gated only; no ownership facts exist.
    Category,
}

impl OwnershipFacts {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::User,
            Self::Project(_) => ResourceKind::Project,
            Self::Task(_) => ResourceKind::Task,
            Self::Category => ResourceKind::Category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::User] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn test_facts_kind() {
        let id = Uuid::new_v4();
        assert_eq!(
            OwnershipFacts::User(UserFacts { id, active: true }).kind(),
            ResourceKind::User
        );
        assert_eq!(OwnershipFacts::Category.kind(), ResourceKind::Category);
    }
}
