//! Generic CRUD handlers, instantiated per resource in the router

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::types::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::services::{CrudService, Resource};
use crate::AppState;

/// Default page size for list endpoints
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.per_page, DEFAULT_PER_PAGE)
    }
}

pub async fn list_resources<R: Resource>(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<R::Filter>,
) -> AppResult<Json<PaginatedResponse<R>>> {
    let service = CrudService::<R>::new(state.db.clone());
    let result = service.list(&filter, page.pagination()).await?;
    Ok(Json(result))
}

pub async fn get_resource<R: Resource>(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<R>> {
    let service = CrudService::<R>::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

pub async fn create_resource<R: Resource>(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<R::Create>,
) -> AppResult<(StatusCode, Json<R>)> {
    let service = CrudService::<R>::new(state.db.clone());
    let record = service.create(&user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_resource<R: Resource>(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<R::Update>,
) -> AppResult<Json<R>> {
    let service = CrudService::<R>::new(state.db.clone());
    let record = service.update(&user.actor(), id, patch).await?;
    Ok(Json(record))
}

pub async fn delete_resource<R: Resource>(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CrudService::<R>::new(state.db.clone());
    service.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
