//! Server health check command.

use anyhow::Result;
use colored::*;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = health
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("unknown");
            let colored_status = match status {
                "ok" => status.green().bold(),
                _ => status.red().bold(),
            };
            println!("Server: {} ({})", colored_status, client.base_url());
            if let Some(version) = health.get("version").and_then(|v| v.as_str()) {
                output::print_detail("version", version);
            }
        }
        _ => output::print_item(&health, format),
    }
    Ok(())
}
