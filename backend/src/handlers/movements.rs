//! Stock movement handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::types::PaginatedResponse;
use shared::{Movement, NewMovement};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::crud::PageQuery;
use crate::middleware::auth::CurrentUser;
use crate::services::movement::{MovementFilter, MovementReceipt};
use crate::services::MovementService;
use crate::AppState;

/// Record an entry or exit and apply it to stock
pub async fn create_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewMovement>,
) -> AppResult<(StatusCode, Json<MovementReceipt>)> {
    let service = MovementService::new(state.db.clone());
    let receipt = service.record(&user.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<PaginatedResponse<Movement>>> {
    let service = MovementService::new(state.db.clone());
    Ok(Json(service.list(&filter, page.pagination()).await?))
}

pub async fn get_movement(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Movement>> {
    let service = MovementService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}
