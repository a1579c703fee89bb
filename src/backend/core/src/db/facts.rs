//! Ownership-fact lookups.
//!
//! These queries are deliberately narrower than the row fetches above:
//! authorization reads only the columns a decision needs, so a permission
//! check never drags a full record across the wire. Facts are fetched
//! fresh on every call; nothing here caches.

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::authz::{FactSource, ProjectFacts, TaskFacts, UserFacts};
use crate::error::ForgeError;

use super::Database;

#[async_trait]
impl FactSource for Database {
    async fn user_facts(&self, id: Uuid) -> Result<Option<UserFacts>, ForgeError> {
        let row = sqlx::query("SELECT id, active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| {
            Ok(UserFacts {
                id: r.try_get("id")?,
                active: r.try_get("active")?,
            })
        })
        .transpose()
    }

    async fn project_facts(
        &self,
        id: Uuid,
        actor: Uuid,
    ) -> Result<Option<ProjectFacts>, ForgeError> {
        let row = sqlx::query(
            r#"
            SELECT created_by,
                   EXISTS (
                       SELECT 1 FROM tasks
                       WHERE tasks.project_id = projects.id
                         AND tasks.assigned_to = $2
                   ) AS actor_is_assigned
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(actor)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            Ok(ProjectFacts {
                created_by: r.try_get("created_by")?,
                actor_is_assigned: r.try_get("actor_is_assigned")?,
            })
        })
        .transpose()
    }

    async fn task_facts(&self, id: Uuid, _actor: Uuid) -> Result<Option<TaskFacts>, ForgeError> {
        let row = sqlx::query(
            r#"
            SELECT tasks.created_by, tasks.assigned_to, tasks.project_id,
                   projects.created_by AS project_created_by
            FROM tasks
            JOIN projects ON projects.id = tasks.project_id
            WHERE tasks.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            Ok(TaskFacts {
                created_by: r.try_get("created_by")?,
                assigned_to: r.try_get("assigned_to")?,
                project_id: r.try_get("project_id")?,
                project_created_by: r.try_get("project_created_by")?,
            })
        })
        .transpose()
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, ForgeError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.try_get(0)?)
    }
}
