//! Access-control evaluator.
//!
//! A single static decision table maps `(ResourceKind, Action)` to a
//! [`Rule`], and a single [`evaluate`] function interprets rules against an
//! actor and the ownership facts for one resource. Handlers never branch on
//! roles themselves; they ask this module.
//!
//! Decisions are deterministic in their inputs and never cached across
//! requests.

use tracing::debug;

use super::model::{Action, Actor, OwnershipFacts, ResourceKind, Role};

// ═══════════════════════════════════════════════════════════════════════════════
// Rules and Relations
// ═══════════════════════════════════════════════════════════════════════════════

/// A relationship between an actor and a resource, derived purely from
/// [`OwnershipFacts`]. A relation that does not apply to the resource kind
/// at hand simply never holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Actor created the resource.
    Creator,
    /// Actor is the task's assignee.
    Assignee,
    /// Actor created the project the resource belongs to (or is).
    ProjectOwner,
    /// Actor is assigned to at least one task in the project.
    ProjectMember,
    /// The resource is the actor's own user record.
    TargetUser,
}

/// One entry in the decision table. Rules compose role gates with
/// relation gates; there is no other vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Any authenticated actor.
    Authenticated,
    /// Actor's role must be one of the listed roles.
    AnyOf(&'static [Role]),
    /// Role match, or any of the listed relations holds.
    AnyOfOrRelated(&'static [Role], &'static [Relation]),
    /// Actor must hold one of the listed roles AND be the resource creator.
    /// Admin short-circuits the ownership check.
    OwnerWithRole(&'static [Role]),
    /// Admin, or any of the listed relations holds.
    AdminOrRelated(&'static [Relation]),
    /// Only the target user themselves. No admin override.
    SelfOnly,
    /// Admin, and the target must not be the actor's own record.
    AdminNotSelf,
}

/// Why a request was denied. Surfaced in logs, never in response bodies;
/// callers see a uniform permission error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    RoleInsufficient,
    NoRelation,
    NotResourceOwner,
    NotSelf,
    SelfTargetForbidden,
    ActionUndefined,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleInsufficient => "role_insufficient",
            Self::NoRelation => "no_relation",
            Self::NotResourceOwner => "not_resource_owner",
            Self::NotSelf => "not_self",
            Self::SelfTargetForbidden => "self_target_forbidden",
            Self::ActionUndefined => "action_undefined",
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Grant)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision Table
// ═══════════════════════════════════════════════════════════════════════════════

const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_MANAGER: &[Role] = &[Role::Admin, Role::Manager];
const MANAGER: &[Role] = &[Role::Manager];

/// Look up the rule governing `(kind, action)`. `None` means the action is
/// not defined for the kind and must be denied.
pub fn rule_for(kind: ResourceKind, action: Action) -> Option<Rule> {
    use Action::*;
    use Relation::*;
    use ResourceKind::*;

    let rule = match (kind, action) {
        // ── Users ────────────────────────────────────────────────────────
        (User, Create) => Rule::AnyOf(ADMIN),
        (User, Read) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[TargetUser]),
        (User, List) => Rule::AnyOf(ADMIN_MANAGER),
        (User, ReadStats) => Rule::AnyOf(ADMIN_MANAGER),
        (User, Update) => Rule::AnyOfOrRelated(ADMIN, &[TargetUser]),
        (User, ChangePassword) => Rule::SelfOnly,
        (User, ChangeRole) => Rule::AnyOf(ADMIN),
        (User, Deactivate) => Rule::AdminNotSelf,
        (User, Delete) => Rule::AdminNotSelf,

        // ── Projects ─────────────────────────────────────────────────────
        (Project, Create) => Rule::AnyOf(ADMIN_MANAGER),
        (Project, Read) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[Creator, ProjectMember]),
        (Project, List) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[Creator, ProjectMember]),
        (Project, Update) => Rule::OwnerWithRole(MANAGER),
        (Project, Delete) => Rule::OwnerWithRole(MANAGER),

        // ── Tasks ────────────────────────────────────────────────────────
        (Task, Create) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[ProjectOwner]),
        (Task, Read) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[Creator, Assignee, ProjectOwner]),
        (Task, List) => Rule::AnyOfOrRelated(ADMIN_MANAGER, &[Creator, Assignee, ProjectOwner]),
        (Task, Update) => Rule::AdminOrRelated(&[Creator, Assignee, ProjectOwner]),
        (Task, ChangeStatus) => Rule::AdminOrRelated(&[Creator, Assignee, ProjectOwner]),
        (Task, Upload) => Rule::AdminOrRelated(&[Creator, Assignee, ProjectOwner]),
        (Task, Delete) => Rule::AdminOrRelated(&[Creator, ProjectOwner]),

        // ── Categories ───────────────────────────────────────────────────
        (Category, Read) | (Category, List) => Rule::Authenticated,
        (Category, Create) | (Category, Update) | (Category, Delete) => {
            Rule::AnyOf(ADMIN_MANAGER)
        }

        _ => return None,
    };
    Some(rule)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

fn relation_holds(relation: Relation, actor: &Actor, facts: &OwnershipFacts) -> bool {
    match (relation, facts) {
        (Relation::TargetUser, OwnershipFacts::User(u)) => u.id == actor.id,

        (Relation::Creator, OwnershipFacts::Project(p)) => p.created_by == actor.id,
        (Relation::ProjectMember, OwnershipFacts::Project(p)) => p.actor_is_assigned,
        (Relation::ProjectOwner, OwnershipFacts::Project(p)) => p.created_by == actor.id,

        (Relation::Creator, OwnershipFacts::Task(t)) => t.created_by == actor.id,
        (Relation::Assignee, OwnershipFacts::Task(t)) => t.assigned_to == Some(actor.id),
        (Relation::ProjectOwner, OwnershipFacts::Task(t)) => t.project_created_by == actor.id,

        _ => false,
    }
}

fn any_relation_holds(relations: &[Relation], actor: &Actor, facts: &OwnershipFacts) -> bool {
    relations.iter().any(|r| relation_holds(*r, actor, facts))
}

/// Evaluate one `(actor, action, facts)` triple against the decision table.
///
/// This is the only grant/deny code path in the system.
pub fn evaluate(actor: &Actor, action: Action, facts: &OwnershipFacts) -> Decision {
    let kind = facts.kind();
    let decision = match rule_for(kind, action) {
        None => Decision::Deny(DenyReason::ActionUndefined),
        Some(rule) => apply_rule(rule, actor, facts),
    };

    match decision {
        Decision::Grant => {
            debug!(
                actor = %actor.id,
                role = %actor.role,
                resource = %kind,
                action = %action,
                "access granted"
            );
        }
        Decision::Deny(reason) => {
            debug!(
                actor = %actor.id,
                role = %actor.role,
                resource = %kind,
                action = %action,
                reason = reason.as_str(),
                "access denied"
            );
        }
    }
    decision
}

/// Evaluate a collection-level `List` for `(actor, kind)`.
///
/// Relation gates cannot be checked against a whole collection; they
/// become the scope filter instead (see [`super::scope`]). Role gates
/// still apply here, so a plain user cannot list users at all.
pub fn evaluate_list(actor: &Actor, kind: ResourceKind) -> Decision {
    match rule_for(kind, Action::List) {
        None => Decision::Deny(DenyReason::ActionUndefined),
        Some(Rule::Authenticated) => Decision::Grant,
        Some(Rule::AnyOf(roles)) => {
            if roles.contains(&actor.role) {
                Decision::Grant
            } else {
                Decision::Deny(DenyReason::RoleInsufficient)
            }
        }
        // Related rows are selected by scoping; the listing itself is open.
        Some(Rule::AnyOfOrRelated(_, _)) => Decision::Grant,
        Some(_) => Decision::Deny(DenyReason::ActionUndefined),
    }
}

fn apply_rule(rule: Rule, actor: &Actor, facts: &OwnershipFacts) -> Decision {
    match rule {
        Rule::Authenticated => Decision::Grant,

        Rule::AnyOf(roles) => {
            if roles.contains(&actor.role) {
                Decision::Grant
            } else {
                Decision::Deny(DenyReason::RoleInsufficient)
            }
        }

        Rule::AnyOfOrRelated(roles, relations) => {
            if roles.contains(&actor.role) || any_relation_holds(relations, actor, facts) {
                Decision::Grant
            } else {
                Decision::Deny(DenyReason::NoRelation)
            }
        }

        Rule::OwnerWithRole(roles) => {
            if actor.is_admin() {
                return Decision::Grant;
            }
            if !roles.contains(&actor.role) {
                return Decision::Deny(DenyReason::RoleInsufficient);
            }
            let owns = match facts {
                OwnershipFacts::Project(p) => p.created_by == actor.id,
                OwnershipFacts::Task(t) => t.created_by == actor.id,
                _ => false,
            };
            if owns {
                Decision::Grant
            } else {
                Decision::Deny(DenyReason::NotResourceOwner)
            }
        }

        Rule::AdminOrRelated(relations) => {
            if actor.is_admin() || any_relation_holds(relations, actor, facts) {
                Decision::Grant
            } else {
                Decision::Deny(DenyReason::NoRelation)
            }
        }

        Rule::SelfOnly => match facts {
            OwnershipFacts::User(u) if u.id == actor.id => Decision::Grant,
            _ => Decision::Deny(DenyReason::NotSelf),
        },

        Rule::AdminNotSelf => {
            if !actor.is_admin() {
                return Decision::Deny(DenyReason::RoleInsufficient);
            }
            match facts {
                OwnershipFacts::User(u) if u.id == actor.id => {
                    Decision::Deny(DenyReason::SelfTargetForbidden)
                }
                _ => Decision::Grant,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::model::{ProjectFacts, TaskFacts, UserFacts};
    use uuid::Uuid;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn manager() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Manager)
    }

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), Role::User)
    }

    fn project_facts(created_by: Uuid, assigned: bool) -> OwnershipFacts {
        OwnershipFacts::Project(ProjectFacts {
            created_by,
            actor_is_assigned: assigned,
        })
    }

    fn task_facts(created_by: Uuid, assigned_to: Option<Uuid>, project_owner: Uuid) -> OwnershipFacts {
        OwnershipFacts::Task(TaskFacts {
            created_by,
            assigned_to,
            project_id: Uuid::new_v4(),
            project_created_by: project_owner,
        })
    }

    fn user_facts(id: Uuid) -> OwnershipFacts {
        OwnershipFacts::User(UserFacts { id, active: true })
    }

    #[test]
    fn test_manager_updates_own_project_only() {
        let m = manager();
        let other = Uuid::new_v4();

        assert!(evaluate(&m, Action::Update, &project_facts(m.id, false)).is_granted());
        assert_eq!(
            evaluate(&m, Action::Update, &project_facts(other, false)),
            Decision::Deny(DenyReason::NotResourceOwner)
        );
    }

    #[test]
    fn test_admin_overrides_project_ownership() {
        let a = admin();
        let other = Uuid::new_v4();
        assert!(evaluate(&a, Action::Delete, &project_facts(other, false)).is_granted());
    }

    #[test]
    fn test_plain_user_cannot_create_project() {
        let u = user();
        let facts = OwnershipFacts::Project(ProjectFacts {
            created_by: u.id,
            actor_is_assigned: false,
        });
        assert_eq!(
            evaluate(&u, Action::Create, &facts),
            Decision::Deny(DenyReason::RoleInsufficient)
        );
    }

    #[test]
    fn test_assignee_sees_project_through_task_membership() {
        let u = user();
        let owner = Uuid::new_v4();

        assert!(evaluate(&u, Action::Read, &project_facts(owner, true)).is_granted());
        assert_eq!(
            evaluate(&u, Action::Read, &project_facts(owner, false)),
            Decision::Deny(DenyReason::NoRelation)
        );
    }

    #[test]
    fn test_task_update_requires_relation() {
        let u = user();
        let stranger = Uuid::new_v4();

        // Creator, assignee, and project owner may all update.
        assert!(evaluate(&u, Action::Update, &task_facts(u.id, None, stranger)).is_granted());
        assert!(
            evaluate(&u, Action::Update, &task_facts(stranger, Some(u.id), stranger)).is_granted()
        );
        assert!(evaluate(&u, Action::Update, &task_facts(stranger, None, u.id)).is_granted());

        // An unrelated user may not, regardless of role below admin.
        assert_eq!(
            evaluate(&u, Action::Update, &task_facts(stranger, None, stranger)),
            Decision::Deny(DenyReason::NoRelation)
        );
        let m = manager();
        assert_eq!(
            evaluate(&m, Action::Update, &task_facts(stranger, None, stranger)),
            Decision::Deny(DenyReason::NoRelation)
        );
    }

    #[test]
    fn test_assignee_cannot_delete_task() {
        let u = user();
        let stranger = Uuid::new_v4();
        assert_eq!(
            evaluate(&u, Action::Delete, &task_facts(stranger, Some(u.id), stranger)),
            Decision::Deny(DenyReason::NoRelation)
        );
        // But the creator can.
        assert!(evaluate(&u, Action::Delete, &task_facts(u.id, None, stranger)).is_granted());
    }

    #[test]
    fn test_manager_sees_all_tasks() {
        let m = manager();
        let stranger = Uuid::new_v4();
        assert!(evaluate(&m, Action::Read, &task_facts(stranger, None, stranger)).is_granted());
    }

    #[test]
    fn test_password_change_is_self_only_even_for_admin() {
        let a = admin();
        let other = Uuid::new_v4();
        assert_eq!(
            evaluate(&a, Action::ChangePassword, &user_facts(other)),
            Decision::Deny(DenyReason::NotSelf)
        );
        assert!(evaluate(&a, Action::ChangePassword, &user_facts(a.id)).is_granted());
    }

    #[test]
    fn test_admin_cannot_deactivate_or_delete_self() {
        let a = admin();
        assert_eq!(
            evaluate(&a, Action::Deactivate, &user_facts(a.id)),
            Decision::Deny(DenyReason::SelfTargetForbidden)
        );
        assert_eq!(
            evaluate(&a, Action::Delete, &user_facts(a.id)),
            Decision::Deny(DenyReason::SelfTargetForbidden)
        );
        let other = Uuid::new_v4();
        assert!(evaluate(&a, Action::Deactivate, &user_facts(other)).is_granted());
    }

    #[test]
    fn test_user_reads_own_record_manager_reads_any() {
        let u = user();
        let other = Uuid::new_v4();
        assert!(evaluate(&u, Action::Read, &user_facts(u.id)).is_granted());
        assert!(!evaluate(&u, Action::Read, &user_facts(other)).is_granted());
        assert!(evaluate(&manager(), Action::Read, &user_facts(other)).is_granted());
    }

    #[test]
    fn test_only_admin_changes_roles() {
        let other = Uuid::new_v4();
        assert!(evaluate(&admin(), Action::ChangeRole, &user_facts(other)).is_granted());
        assert!(!evaluate(&manager(), Action::ChangeRole, &user_facts(other)).is_granted());
        assert!(!evaluate(&user(), Action::ChangeRole, &user_facts(other)).is_granted());
    }

    #[test]
    fn test_categories_readable_by_all_writable_by_elevated() {
        for actor in [admin(), manager(), user()] {
            assert!(evaluate(&actor, Action::Read, &OwnershipFacts::Category).is_granted());
            assert!(evaluate(&actor, Action::List, &OwnershipFacts::Category).is_granted());
        }
        assert!(evaluate(&manager(), Action::Create, &OwnershipFacts::Category).is_granted());
        assert!(!evaluate(&user(), Action::Create, &OwnershipFacts::Category).is_granted());
    }

    #[test]
    fn test_undefined_pairs_deny() {
        assert_eq!(
            evaluate(&admin(), Action::Upload, &OwnershipFacts::Category),
            Decision::Deny(DenyReason::ActionUndefined)
        );
        assert_eq!(
            evaluate(&admin(), Action::ChangePassword, &project_facts(Uuid::new_v4(), false)),
            Decision::Deny(DenyReason::ActionUndefined)
        );
    }

    #[test]
    fn test_list_gates() {
        assert!(evaluate_list(&user(), ResourceKind::Task).is_granted());
        assert!(evaluate_list(&user(), ResourceKind::Project).is_granted());
        assert!(evaluate_list(&user(), ResourceKind::Category).is_granted());
        assert!(!evaluate_list(&user(), ResourceKind::User).is_granted());
        assert!(evaluate_list(&manager(), ResourceKind::User).is_granted());
    }

    #[test]
    fn test_project_creator_without_manager_role_cannot_update() {
        // Ownership alone is not enough for project mutation; the role gate
        // still applies if the creator has since been demoted.
        let u = user();
        assert_eq!(
            evaluate(&u, Action::Update, &project_facts(u.id, false)),
            Decision::Deny(DenyReason::RoleInsufficient)
        );
    }

    #[test]
    fn test_task_create_by_project_owner() {
        let u = user();
        let stranger = Uuid::new_v4();
        // Create consults project facts: a plain user may create tasks only
        // in projects they own.
        assert!(evaluate(&u, Action::Create, &project_facts_for_task(u.id)).is_granted());
        assert!(!evaluate(&u, Action::Create, &project_facts_for_task(stranger)).is_granted());
    }

    fn project_facts_for_task(project_owner: Uuid) -> OwnershipFacts {
        OwnershipFacts::Task(TaskFacts {
            created_by: Uuid::new_v4(),
            assigned_to: None,
            project_id: Uuid::new_v4(),
            project_created_by: project_owner,
        })
    }
}
