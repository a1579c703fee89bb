//! Persisted session: API URL plus the token pair from the last login.
//!
//! Stored as TOML under the user config directory
//! (`~/.config/taskforge/session.toml` on Linux) with owner-only
//! permissions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub api_url: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// Subject and role decoded from the access token at login time.
    pub user_id: String,
    pub role: String,
}

fn session_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("could not determine the user config directory")?
        .join("taskforge");
    Ok(dir.join("session.toml"))
}

impl Session {
    /// Load the stored session, if any.
    pub fn load() -> Option<Self> {
        let path = session_path().ok()?;
        let contents = std::fs::read_to_string(path).ok()?;
        toml::from_str(&contents).ok()
    }

    /// Persist the session to disk.
    pub fn save(&self) -> Result<()> {
        let path = session_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Delete the stored session. Missing file is not an error.
    pub fn clear() -> Result<()> {
        let path = session_path()?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}
