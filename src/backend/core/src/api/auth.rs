//! Session endpoints: login, refresh, logout.

use axum::{extract::State, response::IntoResponse, Json};
use metrics::counter;
use serde::Deserialize;

use crate::error::ForgeError;
use crate::observability::ForgeEvent;

use super::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    let actor = match state
        .credentials
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(actor) => actor,
        Err(e) => {
            counter!("taskforge_logins_total", "outcome" => "failure").increment(1);
            ForgeEvent::LoginFailed {
                username: request.username,
                reason: e.code().to_string(),
            }
            .log();
            return Err(e);
        }
    };

    let pair = state.tokens.issue_pair(&actor)?;
    counter!("taskforge_logins_total", "outcome" => "success").increment(1);
    ForgeEvent::LoginSucceeded {
        user_id: actor.id.to_string(),
        role: actor.role.to_string(),
    }
    .log();

    Ok(Json(ApiResponse::success(pair)))
}

/// Exchange a refresh token for a fresh pair.
///
/// The token's signature proves who the subject was; the credential store
/// decides who they are now. A deleted subject is NotFound, a deactivated
/// one InactiveAccount, and the new pair carries the subject's current
/// role, not the one frozen into the old token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    let claims = state.tokens.verify_refresh(&request.refresh_token)?;
    let actor = state.credentials.fetch_for_refresh(claims.sub).await?;

    let pair = state.tokens.issue_pair(&actor)?;
    ForgeEvent::TokensRefreshed {
        user_id: actor.id.to_string(),
        role: actor.role.to_string(),
    }
    .log();

    Ok(Json(ApiResponse::success(pair)))
}

/// Logout is client-side token discard. There is no revocation store, so
/// an issued access token stays valid until expiry; this endpoint exists
/// so clients have a uniform place to end a session.
pub async fn logout() -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "message": "discard your tokens; access tokens remain valid until expiry"
    })))
}
