//! Task and attachment store.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::authz::{Scope, ScopePredicate};
use crate::error::{ForgeError, Result};
use crate::pagination::OffsetPagination;

use super::models::{AttachmentRow, TaskRow, TaskStatus};
use super::Database;

const TASK_COLUMNS: &str = "id, title, description, status, priority, project_id, category_id, \
                            created_by, assigned_to, due_date, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str =
    "id, task_id, file_name, content_type, size_bytes, checksum, storage_path, \
     uploaded_by, created_at";

#[derive(Debug)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub project_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub category_id: Option<Uuid>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewAttachment {
    pub task_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub storage_path: String,
    pub uploaded_by: Uuid,
}

impl Database {
    pub async fn insert_task(&self, task: &NewTask) -> Result<TaskRow> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks
                (id, title, description, status, priority, project_id, category_id,
                 created_by, assigned_to, due_date)
            VALUES ($1, $2, $3, 'todo', $4, $5, $6, $7, $8, $9)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.priority)
        .bind(task.project_id)
        .bind(task.category_id)
        .bind(task.created_by)
        .bind(task.assigned_to)
        .bind(task.due_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// List tasks under the caller's scope, optionally narrowed to one
    /// project. The project filter composes with scoping; it never
    /// replaces it.
    pub async fn list_tasks(
        &self,
        scope: Scope,
        project_id: Option<Uuid>,
        pagination: OffsetPagination,
    ) -> Result<(Vec<TaskRow>, u64)> {
        let predicate = ScopePredicate::for_tasks(scope, 1);
        let next_param = if predicate.bind.is_some() { 2 } else { 1 };
        let project_clause = if project_id.is_some() {
            format!(" AND tasks.project_id = ${next_param}")
        } else {
            String::new()
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM tasks WHERE {}{}",
            predicate.sql, project_clause
        );
        let mut count_query = sqlx::query(&count_sql);
        if let Some(actor) = predicate.bind {
            count_query = count_query.bind(actor);
        }
        if let Some(project) = project_id {
            count_query = count_query.bind(project);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get(0)?;

        let list_sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {}{} \
             ORDER BY created_at DESC LIMIT {} OFFSET {}",
            predicate.sql,
            project_clause,
            pagination.limit(),
            pagination.offset()
        );
        let mut list_query = sqlx::query_as::<_, TaskRow>(&list_sql);
        if let Some(actor) = predicate.bind {
            list_query = list_query.bind(actor);
        }
        if let Some(project) = project_id {
            list_query = list_query.bind(project);
        }
        let rows = list_query.fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    pub async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<TaskRow> {
        // assigned_to distinguishes "leave alone" from "clear".
        let (set_assignee, assignee) = match patch.assigned_to {
            None => (false, None),
            Some(value) => (true, value),
        };

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                category_id = COALESCE($5, category_id),
                assigned_to = CASE WHEN $6 THEN $7 ELSE assigned_to END,
                due_date = COALESCE($8, due_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.priority)
        .bind(patch.category_id)
        .bind(set_assignee)
        .bind(assignee)
        .bind(patch.due_date)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("task", id))
    }

    pub async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> Result<TaskRow> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("task", id))
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("task", id));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attachments
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn insert_attachment(&self, attachment: &NewAttachment) -> Result<AttachmentRow> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            r#"
            INSERT INTO attachments
                (id, task_id, file_name, content_type, size_bytes, checksum,
                 storage_path, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ATTACHMENT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(attachment.task_id)
        .bind(&attachment.file_name)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.checksum)
        .bind(&attachment.storage_path)
        .bind(attachment.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_attachments(&self, task_id: Uuid) -> Result<Vec<AttachmentRow>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE task_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
