//! Taskforge CLI - Command-line client for the Taskforge tracker.
//!
//! Provides commands for session, user, project, task, category, and
//! health operations.

mod client;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{auth, category, health, project, task, user};
use output::OutputFormat;

/// Taskforge - project/task tracker CLI
#[derive(Parser)]
#[command(
    name = "taskforge",
    version = "0.1.0",
    about = "Taskforge - project/task tracker",
    long_about = "CLI client for the Taskforge tracker: sessions, users, projects, tasks and categories.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "TASKFORGE_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login(auth::LoginArgs),

    /// Show the logged-in identity
    Whoami,

    /// Drop the stored session
    Logout,

    /// User management operations
    #[command(subcommand)]
    User(user::UserCommands),

    /// Project management operations
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Task management operations
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Category management operations
    #[command(subcommand)]
    Category(category::CategoryCommands),

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let session = session::Session::load();
    let api_url = cli
        .api_url
        .clone()
        .or_else(|| session.as_ref().and_then(|s| s.api_url.clone()))
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url, session)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Login(args) => auth::login(args, &client).await,
        Commands::Whoami => auth::whoami(&client, format),
        Commands::Logout => auth::logout(&client).await,
        Commands::User(cmd) => user::execute(cmd, &client, format).await,
        Commands::Project(cmd) => project::execute(cmd, &client, format).await,
        Commands::Task(cmd) => task::execute(cmd, &client, format).await,
        Commands::Category(cmd) => category::execute(cmd, &client, format).await,
        Commands::Health => health::execute(&client, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
