//! Product handlers beyond plain CRUD: autocomplete, bulk delete and import

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::services::import::ImportResponse;
use crate::services::{ImportService, ProductService};
use crate::AppState;

/// Multipart field carrying the spreadsheet
const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub confirmation: String,
}

#[derive(Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// Product name autocomplete
pub async fn search_products(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<String>>> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.search_names(&query.term).await?))
}

/// Delete every product (superuser only)
pub async fn delete_all_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    user.require_superuser()?;
    let service = ProductService::new(state.db.clone());
    let deleted = service.delete_all(&user.actor(), &body.confirmation).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Import products from an uploaded spreadsheet
pub async fn import_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidSpreadsheet(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidSpreadsheet(e.body_text()))?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) = upload.ok_or_else(|| AppError::Validation {
        field: UPLOAD_FIELD.to_string(),
        message: "A spreadsheet file is required".to_string(),
        message_pt: "É necessário enviar uma planilha".to_string(),
    })?;
    if bytes.is_empty() {
        return Err(AppError::InvalidSpreadsheet("the file is empty".to_string()));
    }

    let service = ImportService::new(state.db.clone());
    let report = service
        .import_products(&user.actor(), &filename, &bytes)
        .await?;
    Ok(Json(report.into()))
}
