//! Project management commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::client::{ApiClient, Paginated};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects visible to the caller
    List {
        /// Page number (1-indexed)
        #[arg(long, default_value = "1")]
        page: u64,
        /// Items per page
        #[arg(long, default_value = "20")]
        per_page: u64,
    },

    /// Create a new project
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show a single project
    Show { id: Uuid },

    /// Update a project's name or description
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a project and all of its tasks
    Delete { id: Uuid },
}

fn display_option(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("-").to_string()
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description", display_with = "display_option")]
    description: Option<String>,
    #[tabled(rename = "Owner")]
    created_by: Uuid,
    #[tabled(rename = "Created")]
    created_at: chrono::DateTime<chrono::Utc>,
    #[tabled(skip)]
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn execute(cmd: ProjectCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        ProjectCommands::List { page, per_page } => {
            let path = format!("/api/v1/projects?page={}&per_page={}", page, per_page);
            let result: Paginated<ProjectRow> = client.get(&path).await?;
            output::print_page(&result, "projects", format);
        }
        ProjectCommands::Create { name, description } => {
            let project: ProjectRow = client
                .post(
                    "/api/v1/projects",
                    &json!({
                        "name": name,
                        "description": description,
                    }),
                )
                .await?;
            output::print_success(&format!("Created project {} ({})", project.name, project.id));
        }
        ProjectCommands::Show { id } => {
            let project: ProjectRow = client.get(&format!("/api/v1/projects/{}", id)).await?;
            output::print_item(&project, format);
        }
        ProjectCommands::Update {
            id,
            name,
            description,
        } => {
            let project: ProjectRow = client
                .patch(
                    &format!("/api/v1/projects/{}", id),
                    &json!({
                        "name": name,
                        "description": description,
                    }),
                )
                .await?;
            output::print_success(&format!("Updated project {}", project.id));
        }
        ProjectCommands::Delete { id } => {
            let _: serde_json::Value = client.delete(&format!("/api/v1/projects/{}", id)).await?;
            output::print_success(&format!("Deleted project {}", id));
        }
    }
    Ok(())
}
