//! Category management commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::client::{ApiClient, Paginated};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Page number (1-indexed)
        #[arg(long, default_value = "1")]
        page: u64,
        /// Items per page
        #[arg(long, default_value = "20")]
        per_page: u64,
    },

    /// Create a new category (admin/manager only)
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show a single category
    Show { id: Uuid },

    /// Update a category's name or description
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a category
    Delete { id: Uuid },
}

fn display_option(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("-").to_string()
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description", display_with = "display_option")]
    description: Option<String>,
    #[tabled(rename = "Created")]
    created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn execute(
    cmd: CategoryCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        CategoryCommands::List { page, per_page } => {
            let path = format!("/api/v1/categories?page={}&per_page={}", page, per_page);
            let result: Paginated<CategoryRow> = client.get(&path).await?;
            output::print_page(&result, "categories", format);
        }
        CategoryCommands::Create { name, description } => {
            let category: CategoryRow = client
                .post(
                    "/api/v1/categories",
                    &json!({
                        "name": name,
                        "description": description,
                    }),
                )
                .await?;
            output::print_success(&format!(
                "Created category {} ({})",
                category.name, category.id
            ));
        }
        CategoryCommands::Show { id } => {
            let category: CategoryRow = client.get(&format!("/api/v1/categories/{}", id)).await?;
            output::print_item(&category, format);
        }
        CategoryCommands::Update {
            id,
            name,
            description,
        } => {
            let category: CategoryRow = client
                .patch(
                    &format!("/api/v1/categories/{}", id),
                    &json!({
                        "name": name,
                        "description": description,
                    }),
                )
                .await?;
            output::print_success(&format!("Updated category {}", category.id));
        }
        CategoryCommands::Delete { id } => {
            let _: serde_json::Value = client.delete(&format!("/api/v1/categories/{}", id)).await?;
            output::print_success(&format!("Deleted category {}", id));
        }
    }
    Ok(())
}
