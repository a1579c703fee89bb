//! Mutation guard.
//!
//! Every mutating operation passes through the same sequence before any
//! write happens: locate the target, authorize the actor against fresh
//! ownership facts, validate cross-references carried in the payload, and
//! only then commit. Failures short-circuit in that order, so a caller can
//! never learn whether a resource exists from a permission error on a
//! resource that does not.
//!
//! Ownership facts come from a [`FactSource`]; every fetch runs under a
//! bounded timeout and fails closed.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::ForgeError;

use super::model::{Action, Actor, OwnershipFacts, ProjectFacts, ResourceKind, TaskFacts, UserFacts};
use super::policy::{evaluate, Decision};

/// Read-only supplier of ownership facts and reference-existence checks.
///
/// Implemented by the database layer in production and by in-memory fixtures
/// in tests. Implementations must return [`ForgeError::not_found`]-style
/// errors only through `Ok(None)`; transport failures surface as `Err`.
#[async_trait]
pub trait FactSource: Send + Sync {
    async fn user_facts(&self, id: Uuid) -> Result<Option<UserFacts>, ForgeError>;

    /// Project facts are computed relative to the requesting actor so the
    /// assignment bit can be filled in with a single query.
    async fn project_facts(
        &self,
        id: Uuid,
        actor: Uuid,
    ) -> Result<Option<ProjectFacts>, ForgeError>;

    async fn task_facts(&self, id: Uuid, actor: Uuid) -> Result<Option<TaskFacts>, ForgeError>;

    async fn category_exists(&self, id: Uuid) -> Result<bool, ForgeError>;
}

/// A cross-reference carried in a mutation payload that must exist before
/// the write commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Project(Uuid),
    Category(Uuid),
    Assignee(Uuid),
}

impl Reference {
    fn name(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Category(_) => "category",
            Self::Assignee(_) => "assignee",
        }
    }
}

/// Runs the located → authorized → references-valid sequence for mutating
/// calls. Cheap to clone; holds only the source handle and the timeout.
#[derive(Clone)]
pub struct MutationGuard<S> {
    source: S,
    fact_timeout: Duration,
}

impl<S: FactSource> MutationGuard<S> {
    pub fn new(source: S, fact_timeout: Duration) -> Self {
        Self { source, fact_timeout }
    }

    async fn bounded<T, F>(&self, what: &'static str, fut: F) -> Result<T, ForgeError>
    where
        F: std::future::Future<Output = Result<T, ForgeError>>,
    {
        match timeout(self.fact_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                counter!("taskforge_fact_timeouts_total", "lookup" => what).increment(1);
                Err(ForgeError::unavailable(format!(
                    "{what} lookup exceeded {:?}",
                    self.fact_timeout
                )))
            }
        }
    }

    /// Fetch facts for an existing resource, mapping a missing row to
    /// `NotFound` before any authorization happens.
    pub async fn locate(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<OwnershipFacts, ForgeError> {
        let facts = match kind {
            ResourceKind::User => self
                .bounded("user_facts", self.source.user_facts(id))
                .await?
                .map(OwnershipFacts::User),
            ResourceKind::Project => self
                .bounded("project_facts", self.source.project_facts(id, actor.id))
                .await?
                .map(OwnershipFacts::Project),
            ResourceKind::Task => self
                .bounded("task_facts", self.source.task_facts(id, actor.id))
                .await?
                .map(OwnershipFacts::Task),
            ResourceKind::Category => self
                .bounded("category_exists", self.source.category_exists(id))
                .await?
                .then_some(OwnershipFacts::Category),
        };
        facts.ok_or_else(|| ForgeError::not_found(kind.as_str(), id))
    }

    /// Resolve a payload project reference into facts for a create-time
    /// decision. The project is a reference carried in the payload, not
    /// the mutation target, so a missing row is an invalid reference,
    /// never NotFound.
    pub async fn project_reference_facts(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<ProjectFacts, ForgeError> {
        self.bounded("project_ref", self.source.project_facts(id, actor.id))
            .await?
            .ok_or_else(|| ForgeError::invalid_reference("referenced project does not exist"))
    }

    /// Authorize `action` against already-located facts.
    pub fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        facts: &OwnershipFacts,
    ) -> Result<(), ForgeError> {
        match evaluate(actor, action, facts) {
            Decision::Grant => {
                counter!("taskforge_authz_decisions_total",
                    "resource" => facts.kind().as_str(),
                    "action" => action.as_str(),
                    "outcome" => "grant")
                .increment(1);
                Ok(())
            }
            Decision::Deny(reason) => {
                counter!("taskforge_authz_decisions_total",
                    "resource" => facts.kind().as_str(),
                    "action" => action.as_str(),
                    "outcome" => "deny")
                .increment(1);
                Err(ForgeError::forbidden(format!(
                    "{} {} denied: {}",
                    facts.kind(),
                    action,
                    reason.as_str()
                )))
            }
        }
    }

    /// Authorize a collection listing. Relation gates are handled by the
    /// scope filter; this enforces the role gate only.
    pub fn authorize_list(&self, actor: &Actor, kind: ResourceKind) -> Result<(), ForgeError> {
        match super::policy::evaluate_list(actor, kind) {
            Decision::Grant => Ok(()),
            Decision::Deny(reason) => Err(ForgeError::forbidden(format!(
                "{} list denied: {}",
                kind,
                reason.as_str()
            ))),
        }
    }

    /// Locate then authorize in the mandated order.
    pub async fn check(
        &self,
        actor: &Actor,
        action: Action,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<OwnershipFacts, ForgeError> {
        let facts = self.locate(actor, kind, id).await?;
        self.authorize(actor, action, &facts)?;
        Ok(facts)
    }

    /// Verify every payload cross-reference exists. Runs after
    /// authorization so reference errors cannot leak existence to actors
    /// who would have been denied anyway.
    pub async fn check_references(&self, refs: &[Reference]) -> Result<(), ForgeError> {
        for reference in refs {
            let exists = match *reference {
                Reference::Project(id) => self
                    .bounded("project_ref", self.source.project_facts(id, Uuid::nil()))
                    .await?
                    .is_some(),
                Reference::Category(id) => {
                    self.bounded("category_ref", self.source.category_exists(id))
                        .await?
                }
                Reference::Assignee(id) => self
                    .bounded("assignee_ref", self.source.user_facts(id))
                    .await?
                    .map(|u| u.active)
                    .unwrap_or(false),
            };
            if !exists {
                return Err(ForgeError::invalid_reference(format!(
                    "referenced {} does not exist",
                    reference.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::model::Role;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct MemSource {
        users: HashMap<Uuid, UserFacts>,
        projects: HashMap<Uuid, ProjectFacts>,
        tasks: HashMap<Uuid, TaskFacts>,
        categories: Vec<Uuid>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FactSource for Arc<MemSource> {
        async fn user_facts(&self, id: Uuid) -> Result<Option<UserFacts>, ForgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            Ok(self.users.get(&id).copied())
        }

        async fn project_facts(
            &self,
            id: Uuid,
            _actor: Uuid,
        ) -> Result<Option<ProjectFacts>, ForgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            Ok(self.projects.get(&id).copied())
        }

        async fn task_facts(&self, id: Uuid, _actor: Uuid) -> Result<Option<TaskFacts>, ForgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tasks.get(&id).copied())
        }

        async fn category_exists(&self, id: Uuid) -> Result<bool, ForgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.categories.contains(&id))
        }
    }

    fn guard(source: MemSource) -> MutationGuard<Arc<MemSource>> {
        MutationGuard::new(Arc::new(source), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found_before_forbidden() {
        let g = guard(MemSource::default());
        let actor = Actor::new(Uuid::new_v4(), Role::User);
        let missing = Uuid::new_v4();

        // Even an actor with no conceivable grant sees NotFound first.
        let err = g
            .check(&actor, Action::Delete, ResourceKind::Project, missing)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_forbidden_after_located() {
        let project = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let mut source = MemSource::default();
        source.projects.insert(
            project,
            ProjectFacts { created_by: owner, actor_is_assigned: false },
        );
        let g = guard(source);

        let stranger = Actor::new(Uuid::new_v4(), Role::Manager);
        let err = g
            .check(&stranger, Action::Update, ResourceKind::Project, project)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Forbidden);

        let owner_actor = Actor::new(owner, Role::Manager);
        assert!(g
            .check(&owner_actor, Action::Update, ResourceKind::Project, project)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_slow_fact_source_fails_closed() {
        let target = Uuid::new_v4();
        let mut source = MemSource::default();
        source.users.insert(target, UserFacts { id: target, active: true });
        source.delay = Some(Duration::from_secs(5));
        let g = guard(source);

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let err = g
            .check(&admin, Action::Deactivate, ResourceKind::User, target)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Unavailable);
    }

    #[tokio::test]
    async fn test_slow_project_reference_fails_closed() {
        let project = Uuid::new_v4();
        let mut source = MemSource::default();
        source.projects.insert(
            project,
            ProjectFacts { created_by: Uuid::new_v4(), actor_is_assigned: false },
        );
        source.delay = Some(Duration::from_secs(5));
        let g = guard(source);

        let actor = Actor::new(Uuid::new_v4(), Role::User);
        let err = g
            .project_reference_facts(&actor, project)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Unavailable);
    }

    #[tokio::test]
    async fn test_missing_project_reference_is_invalid() {
        let g = guard(MemSource::default());
        let actor = Actor::new(Uuid::new_v4(), Role::Manager);

        let err = g
            .project_reference_facts(&actor, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidReference);
    }

    #[tokio::test]
    async fn test_reference_checks() {
        let category = Uuid::new_v4();
        let active_user = Uuid::new_v4();
        let inactive_user = Uuid::new_v4();
        let mut source = MemSource::default();
        source.categories.push(category);
        source
            .users
            .insert(active_user, UserFacts { id: active_user, active: true });
        source
            .users
            .insert(inactive_user, UserFacts { id: inactive_user, active: false });
        let g = guard(source);

        assert!(g
            .check_references(&[Reference::Category(category), Reference::Assignee(active_user)])
            .await
            .is_ok());

        let err = g
            .check_references(&[Reference::Category(Uuid::new_v4())])
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidReference);

        // Assigning to a deactivated account is an invalid reference too.
        let err = g
            .check_references(&[Reference::Assignee(inactive_user)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidReference);
    }

    #[tokio::test]
    async fn test_facts_fetched_per_call() {
        let target = Uuid::new_v4();
        let mut source = MemSource::default();
        source.users.insert(target, UserFacts { id: target, active: true });
        let source = Arc::new(source);
        let g = MutationGuard::new(source.clone(), Duration::from_millis(100));

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        g.check(&admin, Action::Read, ResourceKind::User, target)
            .await
            .unwrap();
        g.check(&admin, Action::Read, ResourceKind::User, target)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
