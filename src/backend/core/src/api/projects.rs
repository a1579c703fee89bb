//! Project endpoints.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::authz::{Action, Actor, OwnershipFacts, ProjectFacts, ResourceKind};
use crate::db::projects::{NewProject, ProjectPatch};
use crate::error::ForgeError;
use crate::pagination::OffsetPagination;
use crate::validation;

use super::{ApiResponse, AppState, Paginated};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    validation::validate_name("name", &request.name)?;
    if let Some(description) = &request.description {
        validation::validate_description(description)?;
    }

    // The creation context is the actor's own would-be project; the rule
    // is a pure role gate.
    let facts = OwnershipFacts::Project(ProjectFacts {
        created_by: actor.id,
        actor_is_assigned: false,
    });
    state.guard.authorize(&actor, Action::Create, &facts)?;

    let row = state
        .db
        .insert_project(&NewProject {
            name: request.name,
            description: request.description,
            created_by: actor.id,
        })
        .await?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(pagination): Query<OffsetPagination>,
) -> Result<impl IntoResponse, ForgeError> {
    pagination.validate()?;
    state.guard.authorize_list(&actor, ResourceKind::Project)?;

    let scope = crate::authz::visibility(&actor, ResourceKind::Project);
    let (rows, total) = state.db.list_projects(scope, pagination).await?;

    Ok(Json(ApiResponse::success(Paginated {
        items: rows,
        pagination: pagination.metadata(total),
    })))
}

pub async fn read(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Read, ResourceKind::Project, id)
        .await?;

    let row = state
        .db
        .get_project(id)
        .await?
        .ok_or_else(|| ForgeError::not_found("project", id))?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    if let Some(name) = &request.name {
        validation::validate_name("name", name)?;
    }
    if let Some(description) = &request.description {
        validation::validate_description(description)?;
    }
    state
        .guard
        .check(&actor, Action::Update, ResourceKind::Project, id)
        .await?;

    let row = state
        .db
        .update_project(
            id,
            &ProjectPatch {
                name: request.name,
                description: request.description,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Delete, ResourceKind::Project, id)
        .await?;

    state.db.delete_project(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "project deleted"
    }))))
}
