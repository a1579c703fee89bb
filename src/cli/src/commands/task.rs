//! Task management commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::client::{ApiClient, Paginated};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks visible to the caller
    List {
        /// Restrict to a single project
        #[arg(long)]
        project: Option<Uuid>,
        /// Page number (1-indexed)
        #[arg(long, default_value = "1")]
        page: u64,
        /// Items per page
        #[arg(long, default_value = "20")]
        per_page: u64,
    },

    /// Create a new task in a project
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        project: Uuid,
        #[arg(long, default_value = "0")]
        priority: i32,
        #[arg(long)]
        category: Option<Uuid>,
        #[arg(long)]
        assignee: Option<Uuid>,
        /// Due date, RFC 3339 (e.g. 2026-09-01T12:00:00Z)
        #[arg(long)]
        due: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// Show a single task
    Show { id: Uuid },

    /// Update a task's fields
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        category: Option<Uuid>,
        /// Reassign the task to this user
        #[arg(long, conflicts_with = "unassign")]
        assignee: Option<Uuid>,
        /// Clear the current assignee
        #[arg(long)]
        unassign: bool,
        /// Due date, RFC 3339
        #[arg(long)]
        due: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// Change a task's status
    Status {
        id: Uuid,
        /// New status: todo, in_progress or done
        status: String,
    },

    /// Delete a task
    Delete { id: Uuid },

    /// Upload a file attachment to a task
    Attach {
        id: Uuid,
        /// Path of the file to upload
        file: std::path::PathBuf,
    },

    /// List a task's attachments
    Attachments { id: Uuid },
}

fn display_option<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "Project")]
    project_id: Uuid,
    #[tabled(rename = "Assignee", display_with = "display_option")]
    assigned_to: Option<Uuid>,
    #[tabled(rename = "Due", display_with = "display_option")]
    due_date: Option<chrono::DateTime<chrono::Utc>>,
    #[tabled(skip)]
    #[serde(default)]
    description: Option<String>,
    #[tabled(skip)]
    #[serde(default)]
    category_id: Option<Uuid>,
    #[tabled(skip)]
    #[serde(default)]
    created_by: Option<Uuid>,
    #[tabled(skip)]
    #[serde(default)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[tabled(skip)]
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct AttachmentRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Type")]
    content_type: String,
    #[tabled(rename = "Size")]
    size_bytes: i64,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Uploaded By")]
    uploaded_by: Uuid,
    #[tabled(skip)]
    #[serde(default)]
    task_id: Option<Uuid>,
    #[tabled(skip)]
    #[serde(default)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn execute(cmd: TaskCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        TaskCommands::List {
            project,
            page,
            per_page,
        } => {
            let mut path = format!("/api/v1/tasks?page={}&per_page={}", page, per_page);
            if let Some(project) = project {
                path.push_str(&format!("&project_id={}", project));
            }
            let result: Paginated<TaskRow> = client.get(&path).await?;
            output::print_page(&result, "tasks", format);
        }
        TaskCommands::Create {
            title,
            description,
            project,
            priority,
            category,
            assignee,
            due,
        } => {
            let task: TaskRow = client
                .post(
                    "/api/v1/tasks",
                    &json!({
                        "title": title,
                        "description": description,
                        "project_id": project,
                        "priority": priority,
                        "category_id": category,
                        "assigned_to": assignee,
                        "due_date": due,
                    }),
                )
                .await?;
            output::print_success(&format!("Created task {} ({})", task.title, task.id));
        }
        TaskCommands::Show { id } => {
            let task: TaskRow = client.get(&format!("/api/v1/tasks/{}", id)).await?;
            output::print_item(&task, format);
        }
        TaskCommands::Update {
            id,
            title,
            description,
            priority,
            category,
            assignee,
            unassign,
            due,
        } => {
            // The server distinguishes "absent" from "explicit null" for the
            // assignee, so only include the field when it should change.
            let mut body = serde_json::Map::new();
            if let Some(title) = title {
                body.insert("title".into(), json!(title));
            }
            if let Some(description) = description {
                body.insert("description".into(), json!(description));
            }
            if let Some(priority) = priority {
                body.insert("priority".into(), json!(priority));
            }
            if let Some(category) = category {
                body.insert("category_id".into(), json!(category));
            }
            if unassign {
                body.insert("assigned_to".into(), serde_json::Value::Null);
            } else if let Some(assignee) = assignee {
                body.insert("assigned_to".into(), json!(assignee));
            }
            if let Some(due) = due {
                body.insert("due_date".into(), json!(due));
            }

            let task: TaskRow = client
                .patch(&format!("/api/v1/tasks/{}", id), &body)
                .await?;
            output::print_success(&format!("Updated task {}", task.id));
        }
        TaskCommands::Status { id, status } => {
            let task: TaskRow = client
                .post(
                    &format!("/api/v1/tasks/{}/status", id),
                    &json!({ "status": status }),
                )
                .await?;
            output::print_success(&format!("Task {} is now {}", task.id, task.status));
        }
        TaskCommands::Delete { id } => {
            let _: serde_json::Value = client.delete(&format!("/api/v1/tasks/{}", id)).await?;
            output::print_success(&format!("Deleted task {}", id));
        }
        TaskCommands::Attach { id, file } => {
            let attachment: AttachmentRow = client
                .upload(&format!("/api/v1/tasks/{}/attachments", id), &file)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            output::print_success(&format!(
                "Uploaded {} ({} bytes, sha256 {})",
                attachment.file_name, attachment.size_bytes, attachment.checksum
            ));
        }
        TaskCommands::Attachments { id } => {
            let attachments: Vec<AttachmentRow> = client
                .get(&format!("/api/v1/tasks/{}/attachments", id))
                .await?;
            output::print_list(&attachments, format);
        }
    }
    Ok(())
}
