//! HTTP API.
//!
//! axum router, `/api/v1` surface. All routes except login, refresh,
//! health and metrics sit behind the bearer-token layer; handlers receive
//! the verified [`crate::authz::Actor`] as an extractor and delegate every
//! permission question to the authorization core.

mod auth;
mod categories;
mod projects;
mod tasks;
mod users;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{CredentialStore, TokenService};
use crate::authz::MutationGuard;
use crate::config::StorageConfig;
use crate::db::Database;
use crate::middleware::AuthLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub credentials: CredentialStore,
    pub guard: MutationGuard<Database>,
    pub storage: StorageConfig,
    pub metrics: Option<PrometheusHandle>,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::read).patch(users::update).delete(users::delete),
        )
        .route("/users/:id/password", post(users::change_password))
        .route("/users/:id/deactivate", post(users::deactivate))
        .route("/users/:id/role", post(users::change_role))
        .route("/users/:id/stats", get(users::stats))
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/:id",
            get(projects::read)
                .patch(projects::update)
                .delete(projects::delete),
        )
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/tasks/:id",
            get(tasks::read).patch(tasks::update).delete(tasks::delete),
        )
        .route("/tasks/:id/status", post(tasks::change_status))
        .route(
            "/tasks/:id/attachments",
            get(tasks::list_attachments).post(tasks::upload_attachment),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/:id",
            get(categories::read)
                .patch(categories::update)
                .delete(categories::delete),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/v1", api)
        .layer(AuthLayer::new(state.tokens.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "taskforge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}

/// API response wrapper.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }
}

/// A page of results plus its metadata.
#[derive(serde::Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: crate::pagination::PageMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }
}
