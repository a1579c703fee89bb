//! Task endpoints, including attachments.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::authz::{Action, Actor, OwnershipFacts, ResourceKind, Reference, TaskFacts};
use crate::db::tasks::{NewAttachment, NewTask, TaskPatch};
use crate::db::TaskStatus;
use crate::error::ForgeError;
use crate::observability::{self, ForgeEvent};
use crate::pagination::OffsetPagination;
use crate::validation;

use super::{ApiResponse, AppState, Paginated};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub project_id: Uuid,
    pub category_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub category_id: Option<Uuid>,
    /// `null` clears the assignee; absent leaves it unchanged.
    #[serde(default, with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TaskStatus,
}

// Query-string deserialization cannot flatten numeric fields, so the
// pagination parameters are spelled out here.
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub project_id: Option<Uuid>,
}

impl TaskListParams {
    fn pagination(&self) -> OffsetPagination {
        OffsetPagination {
            page: self.page.unwrap_or(1),
            per_page: self
                .per_page
                .unwrap_or(crate::pagination::DEFAULT_PAGE_SIZE),
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    validation::validate_name("title", &request.title)?;
    if let Some(description) = &request.description {
        validation::validate_description(description)?;
    }

    // Permission to create depends on the target project, which is a
    // payload reference rather than an existing mutation target.
    let project = state
        .guard
        .project_reference_facts(&actor, request.project_id)
        .await?;

    let facts = OwnershipFacts::Task(TaskFacts {
        created_by: actor.id,
        assigned_to: None,
        project_id: request.project_id,
        project_created_by: project.created_by,
    });
    state.guard.authorize(&actor, Action::Create, &facts)?;

    let mut references = Vec::new();
    if let Some(category) = request.category_id {
        references.push(Reference::Category(category));
    }
    if let Some(assignee) = request.assigned_to {
        references.push(Reference::Assignee(assignee));
    }
    state.guard.check_references(&references).await?;

    let row = state
        .db
        .insert_task(&NewTask {
            title: request.title,
            description: request.description,
            priority: request.priority,
            project_id: request.project_id,
            category_id: request.category_id,
            created_by: actor.id,
            assigned_to: request.assigned_to,
            due_date: request.due_date,
        })
        .await?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<TaskListParams>,
) -> Result<impl IntoResponse, ForgeError> {
    let pagination = params.pagination();
    pagination.validate()?;
    state.guard.authorize_list(&actor, ResourceKind::Task)?;

    let scope = crate::authz::visibility(&actor, ResourceKind::Task);
    let (rows, total) = state
        .db
        .list_tasks(scope, params.project_id, pagination)
        .await?;

    Ok(Json(ApiResponse::success(Paginated {
        items: rows,
        pagination: pagination.metadata(total),
    })))
}

pub async fn read(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Read, ResourceKind::Task, id)
        .await?;

    let row = state
        .db
        .get_task(id)
        .await?
        .ok_or_else(|| ForgeError::not_found("task", id))?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    if let Some(title) = &request.title {
        validation::validate_name("title", title)?;
    }
    if let Some(description) = &request.description {
        validation::validate_description(description)?;
    }
    state
        .guard
        .check(&actor, Action::Update, ResourceKind::Task, id)
        .await?;

    let mut references = Vec::new();
    if let Some(category) = request.category_id {
        references.push(Reference::Category(category));
    }
    if let Some(Some(assignee)) = request.assigned_to {
        references.push(Reference::Assignee(assignee));
    }
    state.guard.check_references(&references).await?;

    let row = state
        .db
        .update_task(
            id,
            &TaskPatch {
                title: request.title,
                description: request.description,
                priority: request.priority,
                category_id: request.category_id,
                assigned_to: request.assigned_to,
                due_date: request.due_date,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn change_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::ChangeStatus, ResourceKind::Task, id)
        .await?;

    let row = state.db.set_task_status(id, request.status).await?;
    Ok(Json(ApiResponse::success(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Delete, ResourceKind::Task, id)
        .await?;

    state.db.delete_task(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "task deleted"
    }))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Attachments
// ─────────────────────────────────────────────────────────────────────────────

pub async fn upload_attachment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Upload, ResourceKind::Task, id)
        .await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ForgeError::validation(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| ForgeError::validation("multipart body contains no file"))?;

    let file_name = field
        .file_name()
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ForgeError::validation("attachment is missing a file name"))?;
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ForgeError::validation(format!("failed to read attachment: {e}")))?;
    if bytes.len() > state.storage.max_attachment_bytes {
        return Err(ForgeError::validation(format!(
            "attachment exceeds the {} byte limit",
            state.storage.max_attachment_bytes
        )));
    }

    let checksum = hex::encode(Sha256::digest(&bytes));
    let storage_path = format!(
        "{}/{}/{}-{}",
        state.storage.attachment_dir,
        id,
        Uuid::new_v4(),
        file_name
    );
    if let Some(parent) = std::path::Path::new(&storage_path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ForgeError::new(
                crate::error::ErrorCode::Storage,
                "failed to store attachment",
            )
            .with_source(e))?;
    }
    tokio::fs::write(&storage_path, &bytes)
        .await
        .map_err(|e| {
            ForgeError::new(crate::error::ErrorCode::Storage, "failed to store attachment")
                .with_source(e)
        })?;

    let row = state
        .db
        .insert_attachment(&NewAttachment {
            task_id: id,
            file_name: file_name.clone(),
            content_type,
            size_bytes: bytes.len() as i64,
            checksum,
            storage_path,
            uploaded_by: actor.id,
        })
        .await?;

    observability::metrics::record_attachment(bytes.len() as u64);
    ForgeEvent::AttachmentStored {
        task_id: id.to_string(),
        filename: file_name,
        size_bytes: bytes.len() as u64,
    }
    .log();

    Ok(Json(ApiResponse::success(row)))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Read, ResourceKind::Task, id)
        .await?;

    let rows = state.db.list_attachments(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Strip path separators so a crafted file name cannot escape the
/// attachment directory.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_name("dir\\file.txt"), "dirfile.txt");
    }

    #[test]
    fn test_update_request_assignee_tristate() {
        let absent: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assigned_to, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"assigned_to":null}"#).unwrap();
        assert_eq!(cleared.assigned_to, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"assigned_to":"5e85e972-1f0d-49f4-b9c9-6f8742f0a345"}"#)
                .unwrap();
        assert!(matches!(set.assigned_to, Some(Some(_))));
    }
}
