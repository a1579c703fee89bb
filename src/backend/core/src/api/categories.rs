//! Category endpoints.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::authz::{Action, Actor, OwnershipFacts, ResourceKind};
use crate::db::categories::{CategoryPatch, NewCategory};
use crate::error::ForgeError;
use crate::pagination::OffsetPagination;
use crate::validation;

use super::{ApiResponse, AppState, Paginated};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    validation::validate_name("name", &request.name)?;
    state
        .guard
        .authorize(&actor, Action::Create, &OwnershipFacts::Category)?;

    let row = state
        .db
        .insert_category(&NewCategory {
            name: request.name,
            description: request.description,
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
    state.guard.authorize_list(&actor, ResourceKind::Category)?;

    let (rows, total) = state.db.list_categories(pagination).await?;

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
        .check(&actor, Action::Read, ResourceKind::Category, id)
        .await?;

    let row = state
        .db
        .get_category(id)
        .await?
        .ok_or_else(|| ForgeError::not_found("category", id))?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    if let Some(name) = &request.name {
        validation::validate_name("name", name)?;
    }
    state
        .guard
        .check(&actor, Action::Update, ResourceKind::Category, id)
        .await?;

    let row = state
        .db
        .update_category(
            id,
            &CategoryPatch {
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
        .check(&actor, Action::Delete, ResourceKind::Category, id)
        .await?;

    state.db.delete_category(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "category deleted"
    }))))
}
