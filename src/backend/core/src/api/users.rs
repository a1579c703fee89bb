//! User endpoints.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::authz::{Action, Actor, OwnershipFacts, ResourceKind, Role, UserFacts};
use crate::db::users::{NewUser, UserPatch};
use crate::db::UserView;
use crate::error::ForgeError;
use crate::observability::ForgeEvent;
use crate::pagination::OffsetPagination;
use crate::validation;

use super::{ApiResponse, AppState, Paginated};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Synthetic facts for actions with no existing target row (create, list
/// fallbacks). The nil id can never equal a real actor id, so relation
/// gates never hold against it.
fn no_target() -> OwnershipFacts {
    OwnershipFacts::User(UserFacts {
        id: Uuid::nil(),
        active: true,
    })
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    validation::validate_username(&request.username)?;
    validation::validate_email(&request.email)?;
    validation::validate_password(&request.password)?;
    state.guard.authorize(&actor, Action::Create, &no_target())?;

    let row = state
        .db
        .insert_user(&NewUser {
            username: request.username,
            email: request.email,
            password_hash: hash_password(&request.password)?,
            role: request.role.as_str().to_string(),
        })
        .await?;

    Ok(Json(ApiResponse::success(UserView::from(row))))
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(pagination): Query<OffsetPagination>,
) -> Result<impl IntoResponse, ForgeError> {
    pagination.validate()?;
    state.guard.authorize_list(&actor, ResourceKind::User)?;

    let scope = crate::authz::visibility(&actor, ResourceKind::User);
    let (rows, total) = state.db.list_users(scope, pagination).await?;

    Ok(Json(ApiResponse::success(Paginated {
        items: rows.into_iter().map(UserView::from).collect(),
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
        .check(&actor, Action::Read, ResourceKind::User, id)
        .await?;

    let row = state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| ForgeError::not_found("user", id))?;

    Ok(Json(ApiResponse::success(UserView::from(row))))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    if let Some(username) = &request.username {
        validation::validate_username(username)?;
    }
    if let Some(email) = &request.email {
        validation::validate_email(email)?;
    }
    state
        .guard
        .check(&actor, Action::Update, ResourceKind::User, id)
        .await?;

    let row = state
        .db
        .update_user(
            id,
            &UserPatch {
                username: request.username,
                email: request.email,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserView::from(row))))
}

pub async fn change_password(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    validation::validate_password(&request.new_password)?;
    state
        .guard
        .check(&actor, Action::ChangePassword, ResourceKind::User, id)
        .await?;

    // Self-service password change re-proves the current password.
    let row = state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| ForgeError::not_found("user", id))?;
    state
        .credentials
        .authenticate(&row.username, &request.current_password)
        .await?;

    state
        .db
        .set_password_hash(id, &hash_password(&request.new_password)?)
        .await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "password changed"
    }))))
}

pub async fn change_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::ChangeRole, ResourceKind::User, id)
        .await?;

    let row = state.db.set_role(id, request.role.as_str()).await?;
    ForgeEvent::RoleChanged {
        user_id: id.to_string(),
        new_role: request.role.to_string(),
        by: actor.id.to_string(),
    }
    .log();

    Ok(Json(ApiResponse::success(UserView::from(row))))
}

pub async fn deactivate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Deactivate, ResourceKind::User, id)
        .await?;

    state.db.deactivate_user(id).await?;
    ForgeEvent::UserDeactivated {
        user_id: id.to_string(),
        by: actor.id.to_string(),
    }
    .log();

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "user deactivated"
    }))))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::Delete, ResourceKind::User, id)
        .await?;

    state.db.delete_user(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "user deleted"
    }))))
}

pub async fn stats(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ForgeError> {
    state
        .guard
        .check(&actor, Action::ReadStats, ResourceKind::User, id)
        .await?;

    let stats = state.db.user_stats(id).await?;
    Ok(Json(ApiResponse::success(stats)))
}
