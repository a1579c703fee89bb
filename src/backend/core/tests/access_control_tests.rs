//! End-to-end scenarios for the access-control core: the decision table,
//! query scoping, the mutation guard, and the token lifecycle, exercised
//! without a database through an in-memory fact source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use taskforge_core::auth::TokenService;
use taskforge_core::authz::{
    evaluate, visibility, Action, Actor, Decision, FactSource, MutationGuard, OwnershipFacts,
    ProjectFacts, Reference, ResourceKind, Role, TaskFacts, UserFacts,
};
use taskforge_core::config::AuthConfig;
use taskforge_core::{ErrorCode, ForgeError};

// ─────────────────────────────────────────────────────────────────────────────
// Fixture
// ─────────────────────────────────────────────────────────────────────────────

/// A small org: one admin, one manager with a project, one user assigned
/// to a task in it, and one bystander.
struct Org {
    admin: Actor,
    manager: Actor,
    assignee: Actor,
    bystander: Actor,
    project: Uuid,
    task: Uuid,
    facts: Arc<World>,
}

#[derive(Default)]
struct World {
    users: HashMap<Uuid, UserFacts>,
    projects: HashMap<Uuid, (Uuid, Vec<Uuid>)>, // created_by, assignees
    tasks: HashMap<Uuid, TaskFacts>,
    categories: Vec<Uuid>,
}

/// Newtype over the shared world so `FactSource` (a foreign trait from the
/// test's point of view) can be implemented without tripping the orphan rule.
#[derive(Clone)]
struct Facts(Arc<World>);

#[async_trait]
impl FactSource for Facts {
    async fn user_facts(&self, id: Uuid) -> Result<Option<UserFacts>, ForgeError> {
        Ok(self.0.users.get(&id).copied())
    }

    async fn project_facts(
        &self,
        id: Uuid,
        actor: Uuid,
    ) -> Result<Option<ProjectFacts>, ForgeError> {
        Ok(self.0.projects.get(&id).map(|(created_by, assignees)| ProjectFacts {
            created_by: *created_by,
            actor_is_assigned: assignees.contains(&actor),
        }))
    }

    async fn task_facts(&self, id: Uuid, _actor: Uuid) -> Result<Option<TaskFacts>, ForgeError> {
        Ok(self.0.tasks.get(&id).copied())
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, ForgeError> {
        Ok(self.0.categories.contains(&id))
    }
}

fn org() -> Org {
    let admin = Actor::new(Uuid::new_v4(), Role::Admin);
    let manager = Actor::new(Uuid::new_v4(), Role::Manager);
    let assignee = Actor::new(Uuid::new_v4(), Role::User);
    let bystander = Actor::new(Uuid::new_v4(), Role::User);
    let project = Uuid::new_v4();
    let task = Uuid::new_v4();

    let mut world = World::default();
    for actor in [admin, manager, assignee, bystander] {
        world.users.insert(actor.id, UserFacts { id: actor.id, active: true });
    }
    world.projects.insert(project, (manager.id, vec![assignee.id]));
    world.tasks.insert(
        task,
        TaskFacts {
            created_by: manager.id,
            assigned_to: Some(assignee.id),
            project_id: project,
            project_created_by: manager.id,
        },
    );

    Org {
        admin,
        manager,
        assignee,
        bystander,
        project,
        task,
        facts: Arc::new(world),
    }
}

fn guard(org: &Org) -> MutationGuard<Facts> {
    MutationGuard::new(Facts(org.facts.clone()), Duration::from_millis(200))
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision-table scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_passes_everything_except_self_restricted_actions() {
    let org = org();
    let g = guard(&org);

    for action in [Action::Read, Action::Update, Action::Delete] {
        assert!(g
            .check(&org.admin, action, ResourceKind::Project, org.project)
            .await
            .is_ok());
        assert!(g
            .check(&org.admin, action, ResourceKind::Task, org.task)
            .await
            .is_ok());
    }

    // Self-restricted: no deactivate/delete of own account, no password
    // change for someone else.
    let err = g
        .check(&org.admin, Action::Deactivate, ResourceKind::User, org.admin.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let err = g
        .check(&org.admin, Action::Delete, ResourceKind::User, org.admin.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let err = g
        .check(&org.admin, Action::ChangePassword, ResourceKind::User, org.assignee.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    // The same actions against another account are fine.
    assert!(g
        .check(&org.admin, Action::Deactivate, ResourceKind::User, org.bystander.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn task_update_rights_follow_relations() {
    let org = org();
    let g = guard(&org);

    // Project owner and assignee may update; the bystander may not.
    assert!(g
        .check(&org.manager, Action::Update, ResourceKind::Task, org.task)
        .await
        .is_ok());
    assert!(g
        .check(&org.assignee, Action::Update, ResourceKind::Task, org.task)
        .await
        .is_ok());
    let err = g
        .check(&org.bystander, Action::Update, ResourceKind::Task, org.task)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    // The assignee may move status but not delete.
    assert!(g
        .check(&org.assignee, Action::ChangeStatus, ResourceKind::Task, org.task)
        .await
        .is_ok());
    let err = g
        .check(&org.assignee, Action::Delete, ResourceKind::Task, org.task)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn manager_updates_only_own_projects() {
    let mut org = org();
    let other_manager = Actor::new(Uuid::new_v4(), Role::Manager);
    Arc::get_mut(&mut org.facts)
        .unwrap()
        .users
        .insert(other_manager.id, UserFacts { id: other_manager.id, active: true });
    let g = guard(&org);

    assert!(g
        .check(&org.manager, Action::Update, ResourceKind::Project, org.project)
        .await
        .is_ok());
    let err = g
        .check(&other_manager, Action::Update, ResourceKind::Project, org.project)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert!(g
        .check(&org.admin, Action::Update, ResourceKind::Project, org.project)
        .await
        .is_ok());
}

#[tokio::test]
async fn missing_target_is_not_found_for_every_role() {
    let org = org();
    let g = guard(&org);
    let missing = Uuid::new_v4();

    for actor in [org.admin, org.manager, org.assignee, org.bystander] {
        let err = g
            .check(&actor, Action::Update, ResourceKind::Task, missing)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound, "role {:?}", actor.role);
    }
}

#[tokio::test]
async fn references_checked_after_authorization() {
    let org = org();
    let g = guard(&org);

    // An existing category and an active assignee pass.
    let mut world = (*org.facts).clone_shallow();
    let category = Uuid::new_v4();
    world.categories.push(category);
    let g2 = MutationGuard::new(Facts(Arc::new(world)), Duration::from_millis(200));
    assert!(g2
        .check_references(&[Reference::Category(category), Reference::Assignee(org.assignee.id)])
        .await
        .is_ok());

    // A vanished category is an invalid reference.
    let err = g
        .check_references(&[Reference::Category(Uuid::new_v4())])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

impl World {
    fn clone_shallow(&self) -> World {
        World {
            users: self.users.clone(),
            projects: self.projects.clone(),
            tasks: self.tasks.clone(),
            categories: self.categories.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoping agreement
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn scoped_visibility_agrees_with_point_reads() {
    let org = org();

    // Every actor/row combination: a row visible in a list is readable by
    // id, and an invisible one is not.
    let project_facts = ProjectFacts {
        created_by: org.manager.id,
        actor_is_assigned: false,
    };
    for actor in [org.admin, org.manager, org.bystander] {
        let scope = visibility(&actor, ResourceKind::Project);
        let listed = taskforge_core::authz::permits_project(scope, &project_facts);
        let readable = evaluate(
            &actor,
            Action::Read,
            &OwnershipFacts::Project(project_facts),
        )
        .is_granted();
        assert_eq!(listed, readable, "role {:?}", actor.role);
    }

    // The assignee sees the project through membership; their scope must
    // agree once the membership bit is set.
    let member_facts = ProjectFacts {
        created_by: org.manager.id,
        actor_is_assigned: true,
    };
    let scope = visibility(&org.assignee, ResourceKind::Project);
    assert!(taskforge_core::authz::permits_project(scope, &member_facts));
    assert!(evaluate(
        &org.assignee,
        Action::Read,
        &OwnershipFacts::Project(member_facts)
    )
    .is_granted());
}

// ─────────────────────────────────────────────────────────────────────────────
// Token lifecycle
// ─────────────────────────────────────────────────────────────────────────────

fn token_service() -> TokenService {
    TokenService::new(&AuthConfig {
        access_secret: "integration-access-secret".into(),
        refresh_secret: "integration-refresh-secret".into(),
        access_ttl: Duration::from_secs(3600),
        refresh_ttl: Duration::from_secs(86_400),
        leeway_secs: 0,
    })
}

#[test]
fn issued_access_token_carries_identity_and_role() {
    let svc = token_service();
    let actor = Actor::new(Uuid::new_v4(), Role::Manager);
    let pair = svc.issue_pair(&actor).unwrap();

    let claims = svc.verify_access(&pair.access_token).unwrap();
    assert_eq!(claims.actor(), actor);
    assert!(pair.expires_in > 0);
}

#[test]
fn refresh_token_cannot_authenticate_requests() {
    let svc = token_service();
    let actor = Actor::new(Uuid::new_v4(), Role::User);
    let pair = svc.issue_pair(&actor).unwrap();

    assert!(svc.verify_access(&pair.refresh_token).is_err());
    assert!(svc.verify_refresh(&pair.refresh_token).is_ok());
}

#[tokio::test]
async fn deactivated_account_still_has_valid_access_token() {
    // The documented trust boundary: verify_access is pure, so flipping
    // `active` off does not invalidate outstanding access tokens. Only the
    // refresh path consults the live account state.
    let svc = token_service();
    let mut org = org();
    let actor = org.bystander;
    let pair = svc.issue_pair(&actor).unwrap();

    Arc::get_mut(&mut org.facts)
        .unwrap()
        .users
        .insert(actor.id, UserFacts { id: actor.id, active: false });

    // Access verification still succeeds.
    assert!(svc.verify_access(&pair.access_token).is_ok());

    // But the user-kind reference check now treats the account as gone.
    let g = guard(&org);
    let err = g
        .check_references(&[Reference::Assignee(actor.id)])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[test]
fn decisions_are_pure_and_repeatable() {
    let org = org();
    let facts = OwnershipFacts::Task(TaskFacts {
        created_by: org.manager.id,
        assigned_to: Some(org.assignee.id),
        project_id: org.project,
        project_created_by: org.manager.id,
    });

    let first = evaluate(&org.bystander, Action::Update, &facts);
    for _ in 0..10 {
        assert_eq!(evaluate(&org.bystander, Action::Update, &facts), first);
    }
    assert!(matches!(first, Decision::Deny(_)));
}
