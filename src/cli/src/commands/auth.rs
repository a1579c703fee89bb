//! Session commands: login, whoami, logout.

use anyhow::{Context, Result};
use base64::Engine;
use clap::Args;
use serde::Deserialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};
use crate::session::Session;

#[derive(Args)]
pub struct LoginArgs {
    /// Username to authenticate as
    #[arg(short, long)]
    pub username: String,

    /// Password (prompted on stdin when omitted)
    #[arg(short, long, env = "TASKFORGE_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

/// Claims we care about from the access token payload. The token is not
/// verified client-side; the identity is informational only.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    role: String,
}

fn decode_claims(token: &str) -> Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .context("access token is not a JWT")?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .context("access token payload is not valid base64")?;
    serde_json::from_slice(&bytes).context("access token payload is not valid JSON")
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(args: LoginArgs, client: &ApiClient) -> Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => read_password()?,
    };

    let pair: TokenPair = client
        .post(
            "/api/v1/auth/login",
            &json!({
                "username": args.username,
                "password": password,
            }),
        )
        .await?;

    let claims = decode_claims(&pair.access_token)?;

    let session = Session {
        api_url: Some(client.base_url().to_string()),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user_id: claims.sub,
        role: claims.role,
    };
    session.save()?;

    output::print_success(&format!(
        "Logged in as {} ({}), token valid for {}s",
        args.username, session.role, pair.expires_in
    ));
    Ok(())
}

pub fn whoami(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let session = client
        .session()
        .context("not logged in (run `taskforge login` first)")?;

    match format {
        OutputFormat::Table => {
            output::print_heading("Current session");
            output::print_detail("user id", &session.user_id);
            output::print_detail("role", &session.role);
            output::print_detail(
                "api url",
                session.api_url.as_deref().unwrap_or(client.base_url()),
            );
        }
        _ => {
            let view = json!({
                "user_id": session.user_id,
                "role": session.role,
                "api_url": session.api_url.as_deref().unwrap_or(client.base_url()),
            });
            output::print_item(&view, format);
        }
    }
    Ok(())
}

pub async fn logout(client: &ApiClient) -> Result<()> {
    if client.session().is_some() {
        // Best effort; the server does not track sessions, so a network
        // failure here should not keep the local session around.
        let _ = client
            .post::<_, serde_json::Value>("/api/v1/auth/logout", &json!({}))
            .await;
    }
    Session::clear()?;
    output::print_success("Logged out");
    Ok(())
}
