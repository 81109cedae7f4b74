//! Dashboard and report handlers

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::analytics::Granularity;
use shared::types::{PaginatedResponse, Pagination};
use shared::MovementDirection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::handlers::crud::DEFAULT_PER_PAGE;
use crate::services::analytics::{DashboardMetrics, HistoryFilter};
use crate::services::AnalyticsService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ReportQuery {
    fn is_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }

    /// CSV exports carry the whole report; JSON is served a page at a time
    fn window(&self) -> Option<Pagination> {
        (!self.is_csv()).then(|| Pagination::from_query(self.page, self.per_page, DEFAULT_PER_PAGE))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// year | month | day, or anual | mensal | quinzenal
    pub granularity: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub direction: Option<MovementDirection>,
    pub product_id: Option<Uuid>,
    pub format: Option<String>,
}

impl HistoryQuery {
    fn filter(&self) -> AppResult<HistoryFilter> {
        let granularity = match self.granularity.as_deref() {
            None | Some("") => Granularity::default(),
            Some(value) => value.parse().map_err(|e: shared::analytics::UnknownGranularity| {
                AppError::Validation {
                    field: "granularity".to_string(),
                    message: e.to_string(),
                    message_pt: format!("Período inválido: {}", e.0),
                }
            })?,
        };

        Ok(HistoryFilter {
            granularity,
            start_date: self.start_date,
            end_date: self.end_date,
            direction: self.direction,
            product_id: self.product_id,
        })
    }
}

fn csv_download<T: Serialize>(data: &[T], filename: &str) -> AppResult<Response> {
    let csv = AnalyticsService::export_to_csv(data)?;
    let disposition = format!("attachment; filename=\"{}.csv\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// JSON by default, CSV download when `format=csv`
fn respond<T: Serialize>(data: Vec<T>, format: Option<&str>, filename: &str) -> AppResult<Response> {
    if format == Some("csv") {
        csv_download(&data, filename)
    } else {
        Ok(Json(data).into_response())
    }
}

/// A report that is paginated as JSON and complete as CSV
fn respond_report<T: Serialize>(
    (data, total): (Vec<T>, u64),
    query: &ReportQuery,
    filename: &str,
) -> AppResult<Response> {
    match query.window() {
        None => csv_download(&data, filename),
        Some(page) => Ok(Json(PaginatedResponse::new(data, page, total)).into_response()),
    }
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let service = AnalyticsService::new(state.db.clone());
    Ok(Json(service.dashboard().await?))
}

pub async fn get_low_stock_report(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = AnalyticsService::new(state.db.clone());
    let report = service.low_stock(query.window()).await?;
    respond_report(report, &query, "low_stock")
}

pub async fn get_turnover_report(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = AnalyticsService::new(state.db.clone());
    let report = service.turnover(query.window()).await?;
    respond_report(report, &query, "turnover")
}

pub async fn get_movement_history(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Response> {
    let service = AnalyticsService::new(state.db.clone());
    let data = service.movement_history(&query.filter()?).await?;
    respond(data, query.format.as_deref(), "movement_history")
}

pub async fn get_supplier_purchases(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = AnalyticsService::new(state.db.clone());
    let data = service
        .supplier_purchases(query.start_date, query.end_date)
        .await?;
    respond(data, query.format.as_deref(), "supplier_purchases")
}
