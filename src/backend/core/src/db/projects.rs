//! Project store.

use sqlx::Row;
use uuid::Uuid;

use crate::authz::{Scope, ScopePredicate};
use crate::error::{ForgeError, Result};
use crate::pagination::OffsetPagination;

use super::models::ProjectRow;
use super::Database;

const PROJECT_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

#[derive(Debug)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Database {
    pub async fn insert_project(&self, project: &NewProject) -> Result<ProjectRow> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            INSERT INTO projects (id, name, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_projects(
        &self,
        scope: Scope,
        pagination: OffsetPagination,
    ) -> Result<(Vec<ProjectRow>, u64)> {
        let predicate = ScopePredicate::for_projects(scope, 1);

        let count_sql = format!("SELECT COUNT(*) FROM projects WHERE {}", predicate.sql);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(actor) = predicate.bind {
            count_query = count_query.bind(actor);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get(0)?;

        let list_sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE {} \
             ORDER BY created_at DESC LIMIT {} OFFSET {}",
            predicate.sql,
            pagination.limit(),
            pagination.offset()
        );
        let mut list_query = sqlx::query_as::<_, ProjectRow>(&list_sql);
        if let Some(actor) = predicate.bind {
            list_query = list_query.bind(actor);
        }
        let rows = list_query.fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    pub async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<ProjectRow> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("project", id))
    }

    /// Delete a project and everything hanging off it (tasks cascade via
    /// the schema).
    pub async fn delete_project(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("project", id));
        }
        Ok(())
    }
}
