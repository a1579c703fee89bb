//! Query scoping for list endpoints.
//!
//! List queries must be filtered at the query layer, not post-filtered in
//! memory, so pagination counts stay correct and rows invisible to the
//! actor never leave the database. [`visibility`] derives the scope from
//! the same role semantics the point evaluator uses; the pure `permits_*`
//! predicates exist so the two can be checked against each other without a
//! database.

use uuid::Uuid;

use super::model::{Actor, ProjectFacts, ResourceKind, Role, TaskFacts};

/// How far an actor can see into a resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No filter: every row is visible.
    Unrestricted,
    /// Only rows the actor is related to (created, assigned, or owns the
    /// enclosing project, per resource kind).
    Restricted(Uuid),
    /// Only the actor's own row. Used for user listings by plain users.
    SelfRow(Uuid),
}

impl Scope {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

/// Derive the list scope for `(actor, kind)`.
///
/// Admins and managers see everything except user self-listing rules;
/// plain users see related rows only. Categories are globally readable.
pub fn visibility(actor: &Actor, kind: ResourceKind) -> Scope {
    match kind {
        ResourceKind::Category => Scope::Unrestricted,
        ResourceKind::User => match actor.role {
            Role::Admin | Role::Manager => Scope::Unrestricted,
            Role::User => Scope::SelfRow(actor.id),
        },
        ResourceKind::Project | ResourceKind::Task => match actor.role {
            Role::Admin | Role::Manager => Scope::Unrestricted,
            Role::User => Scope::Restricted(actor.id),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SQL predicate rendering
// ═══════════════════════════════════════════════════════════════════════════════

/// A scope rendered as a SQL predicate fragment plus its bind parameter.
///
/// The fragment references the listed table's columns directly; bind
/// placeholders start at `first_param`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePredicate {
    pub sql: String,
    pub bind: Option<Uuid>,
}

impl ScopePredicate {
    /// Predicate over the `projects` table: creator, or assignee of at
    /// least one task in the project.
    pub fn for_projects(scope: Scope, first_param: usize) -> Self {
        match scope {
            Scope::Unrestricted => Self { sql: "TRUE".into(), bind: None },
            Scope::Restricted(actor) | Scope::SelfRow(actor) => Self {
                sql: format!(
                    "(projects.created_by = ${p} OR EXISTS (\
                     SELECT 1 FROM tasks \
                     WHERE tasks.project_id = projects.id \
                       AND tasks.assigned_to = ${p}))",
                    p = first_param
                ),
                bind: Some(actor),
            },
        }
    }

    /// Predicate over the `tasks` table: creator, assignee, or owner of
    /// the enclosing project.
    pub fn for_tasks(scope: Scope, first_param: usize) -> Self {
        match scope {
            Scope::Unrestricted => Self { sql: "TRUE".into(), bind: None },
            Scope::Restricted(actor) | Scope::SelfRow(actor) => Self {
                sql: format!(
                    "(tasks.created_by = ${p} OR tasks.assigned_to = ${p} \
                     OR EXISTS (\
                     SELECT 1 FROM projects \
                     WHERE projects.id = tasks.project_id \
                       AND projects.created_by = ${p}))",
                    p = first_param
                ),
                bind: Some(actor),
            },
        }
    }

    /// Predicate over the `users` table.
    pub fn for_users(scope: Scope, first_param: usize) -> Self {
        match scope {
            Scope::Unrestricted => Self { sql: "TRUE".into(), bind: None },
            Scope::Restricted(actor) | Scope::SelfRow(actor) => Self {
                sql: format!("users.id = ${}", first_param),
                bind: Some(actor),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pure predicates
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a project row would survive the scope filter. Mirrors the SQL
/// in [`ScopePredicate::for_projects`].
pub fn permits_project(scope: Scope, facts: &ProjectFacts) -> bool {
    match scope {
        Scope::Unrestricted => true,
        Scope::Restricted(actor) | Scope::SelfRow(actor) => {
            facts.created_by == actor || facts.actor_is_assigned
        }
    }
}

/// Whether a task row would survive the scope filter. Mirrors the SQL in
/// [`ScopePredicate::for_tasks`].
pub fn permits_task(scope: Scope, actor_id: Uuid, facts: &TaskFacts) -> bool {
    match scope {
        Scope::Unrestricted => true,
        Scope::Restricted(actor) | Scope::SelfRow(actor) => {
            debug_assert_eq!(actor, actor_id);
            facts.created_by == actor
                || facts.assigned_to == Some(actor)
                || facts.project_created_by == actor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::model::{Action, Actor, OwnershipFacts};
    use crate::authz::policy::evaluate;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    #[test]
    fn test_visibility_by_role() {
        let a = actor(Role::Admin);
        let m = actor(Role::Manager);
        let u = actor(Role::User);

        assert_eq!(visibility(&a, ResourceKind::Project), Scope::Unrestricted);
        assert_eq!(visibility(&m, ResourceKind::Task), Scope::Unrestricted);
        assert_eq!(visibility(&u, ResourceKind::Project), Scope::Restricted(u.id));
        assert_eq!(visibility(&u, ResourceKind::User), Scope::SelfRow(u.id));
        assert_eq!(visibility(&u, ResourceKind::Category), Scope::Unrestricted);
    }

    #[test]
    fn test_project_predicate_binds_actor_once() {
        let id = Uuid::new_v4();
        let p = ScopePredicate::for_projects(Scope::Restricted(id), 1);
        assert_eq!(p.bind, Some(id));
        assert!(p.sql.contains("projects.created_by = $1"));
        assert!(p.sql.contains("tasks.assigned_to = $1"));

        let open = ScopePredicate::for_projects(Scope::Unrestricted, 1);
        assert_eq!(open.sql, "TRUE");
        assert_eq!(open.bind, None);
    }

    #[test]
    fn test_task_predicate_parameter_offset() {
        let id = Uuid::new_v4();
        let p = ScopePredicate::for_tasks(Scope::Restricted(id), 3);
        assert!(p.sql.contains("tasks.created_by = $3"));
        assert!(!p.sql.contains("$1"));
    }

    // Scoping must agree with the point evaluator: every row a list scope
    // lets through must also pass a Read evaluation, and vice versa.
    #[test]
    fn test_scope_matches_evaluator_for_projects() {
        let stranger = Uuid::new_v4();
        for role in [Role::Admin, Role::Manager, Role::User] {
            let actor = actor(role);
            let scope = visibility(&actor, ResourceKind::Project);
            let cases = [
                ProjectFacts { created_by: actor.id, actor_is_assigned: false },
                ProjectFacts { created_by: stranger, actor_is_assigned: true },
                ProjectFacts { created_by: stranger, actor_is_assigned: false },
            ];
            for facts in cases {
                let listed = permits_project(scope, &facts);
                let readable =
                    evaluate(&actor, Action::Read, &OwnershipFacts::Project(facts)).is_granted();
                assert_eq!(listed, readable, "role={role:?} facts={facts:?}");
            }
        }
    }

    #[test]
    fn test_scope_matches_evaluator_for_tasks() {
        let stranger = Uuid::new_v4();
        for role in [Role::Admin, Role::Manager, Role::User] {
            let actor = actor(role);
            let scope = visibility(&actor, ResourceKind::Task);
            let cases = [
                TaskFacts {
                    created_by: actor.id,
                    assigned_to: None,
                    project_id: Uuid::new_v4(),
                    project_created_by: stranger,
                },
                TaskFacts {
                    created_by: stranger,
                    assigned_to: Some(actor.id),
                    project_id: Uuid::new_v4(),
                    project_created_by: stranger,
                },
                TaskFacts {
                    created_by: stranger,
                    assigned_to: None,
                    project_id: Uuid::new_v4(),
                    project_created_by: actor.id,
                },
                TaskFacts {
                    created_by: stranger,
                    assigned_to: Some(stranger),
                    project_id: Uuid::new_v4(),
                    project_created_by: stranger,
                },
            ];
            for facts in cases {
                let listed = permits_task(scope, actor.id, &facts);
                let readable =
                    evaluate(&actor, Action::Read, &OwnershipFacts::Task(facts)).is_granted();
                assert_eq!(listed, readable, "role={role:?} facts={facts:?}");
            }
        }
    }

    // Widening a role never hides a row that was visible before.
    #[test]
    fn test_scope_monotonic_in_role() {
        let stranger = Uuid::new_v4();
        let id = Uuid::new_v4();
        let facts = [
            ProjectFacts { created_by: id, actor_is_assigned: false },
            ProjectFacts { created_by: stranger, actor_is_assigned: true },
            ProjectFacts { created_by: stranger, actor_is_assigned: false },
        ];
        for f in facts {
            let as_user = permits_project(visibility(&Actor::new(id, Role::User), ResourceKind::Project), &f);
            let as_manager =
                permits_project(visibility(&Actor::new(id, Role::Manager), ResourceKind::Project), &f);
            let as_admin =
                permits_project(visibility(&Actor::new(id, Role::Admin), ResourceKind::Project), &f);
            assert!(!as_user || as_manager, "manager lost visibility: {f:?}");
            assert!(!as_manager || as_admin, "admin lost visibility: {f:?}");
        }
    }
}
