//! User and profile handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::types::PaginatedResponse;
use shared::{ProfilePatch, User};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::crud::PageQuery;
use crate::middleware::auth::CurrentUser;
use crate::services::UserService;
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get(user.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ProfilePatch>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.update_profile(&user.actor(), body).await?))
}

/// List accounts (staff only)
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    user.require_staff()?;
    let service = UserService::new(state.db.clone());
    Ok(Json(service.list(page.pagination()).await?))
}

/// Delete an account (superuser only)
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_superuser()?;
    let service = UserService::new(state.db.clone());
    service.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
