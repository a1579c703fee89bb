//! User management commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::client::{ApiClient, Paginated};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users visible to the caller
    List {
        /// Page number (1-indexed)
        #[arg(long, default_value = "1")]
        page: u64,
        /// Items per page
        #[arg(long, default_value = "20")]
        per_page: u64,
    },

    /// Create a new user (admin only)
    Create {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Role: admin, manager or user
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Show a single user
    Show { id: Uuid },

    /// Update a user's username or email
    Update {
        id: Uuid,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Change your own password
    Password {
        id: Uuid,
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// Change a user's role (admin only)
    Role {
        id: Uuid,
        /// New role: admin, manager or user
        role: String,
    },

    /// Deactivate a user account (admin only)
    Deactivate { id: Uuid },

    /// Delete a user (admin only)
    Delete { id: Uuid },

    /// Show task/project counts for a user
    Stats { id: Uuid },
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "Created")]
    created_at: chrono::DateTime<chrono::Utc>,
    #[tabled(skip)]
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
struct StatsRow {
    #[tabled(rename = "Tasks Created")]
    tasks_created: i64,
    #[tabled(rename = "Tasks Assigned")]
    tasks_assigned: i64,
    #[tabled(rename = "Tasks Open")]
    tasks_open: i64,
    #[tabled(rename = "Projects Created")]
    projects_created: i64,
}

pub async fn execute(cmd: UserCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        UserCommands::List { page, per_page } => {
            let path = format!("/api/v1/users?page={}&per_page={}", page, per_page);
            let result: Paginated<UserRow> = client.get(&path).await?;
            output::print_page(&result, "users", format);
        }
        UserCommands::Create {
            username,
            email,
            password,
            role,
        } => {
            let user: UserRow = client
                .post(
                    "/api/v1/users",
                    &json!({
                        "username": username,
                        "email": email,
                        "password": password,
                        "role": role,
                    }),
                )
                .await?;
            output::print_success(&format!("Created user {} ({})", user.username, user.id));
        }
        UserCommands::Show { id } => {
            let user: UserRow = client.get(&format!("/api/v1/users/{}", id)).await?;
            output::print_item(&user, format);
        }
        UserCommands::Update {
            id,
            username,
            email,
        } => {
            let user: UserRow = client
                .patch(
                    &format!("/api/v1/users/{}", id),
                    &json!({
                        "username": username,
                        "email": email,
                    }),
                )
                .await?;
            output::print_success(&format!("Updated user {}", user.id));
        }
        UserCommands::Password { id, current, new } => {
            let _: serde_json::Value = client
                .post(
                    &format!("/api/v1/users/{}/password", id),
                    &json!({
                        "current_password": current,
                        "new_password": new,
                    }),
                )
                .await?;
            output::print_success("Password changed");
        }
        UserCommands::Role { id, role } => {
            let user: UserRow = client
                .post(
                    &format!("/api/v1/users/{}/role", id),
                    &json!({ "role": role }),
                )
                .await?;
            output::print_success(&format!("User {} is now {}", user.id, user.role));
        }
        UserCommands::Deactivate { id } => {
            let _: serde_json::Value = client
                .post(
                    &format!("/api/v1/users/{}/deactivate", id),
                    &json!({}),
                )
                .await?;
            output::print_success(&format!("Deactivated user {}", id));
        }
        UserCommands::Delete { id } => {
            let _: serde_json::Value = client.delete(&format!("/api/v1/users/{}", id)).await?;
            output::print_success(&format!("Deleted user {}", id));
        }
        UserCommands::Stats { id } => {
            let stats: StatsRow = client.get(&format!("/api/v1/users/{}/stats", id)).await?;
            output::print_list(&[stats], format);
        }
    }
    Ok(())
}
