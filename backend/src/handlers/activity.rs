//! Activity log handlers

use axum::{
    extract::{Query, State},
    Json,
};
use shared::types::PaginatedResponse;
use shared::ActivityLog;

use crate::error::AppResult;
use crate::handlers::crud::PageQuery;
use crate::middleware::auth::CurrentUser;
use crate::services::audit::ActivityFilter;
use crate::services::ActivityService;
use crate::AppState;

/// Staff-only listing, newest first
pub async fn list_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ActivityFilter>,
) -> AppResult<Json<PaginatedResponse<ActivityLog>>> {
    user.require_staff()?;
    let service = ActivityService::new(state.db.clone());
    Ok(Json(service.list(&filter, page.pagination()).await?))
}
