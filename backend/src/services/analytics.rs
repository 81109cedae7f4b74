//! Dashboard aggregations and report export

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::analytics::{Granularity, PeriodTotal};
use shared::types::Pagination;
use shared::{MovementDirection, ProductView};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// How many products the dashboard's low-stock and turnover previews show
pub const DASHBOARD_LIST_LIMIT: u32 = 10;

/// Stock totals and the lists shown on the dashboard
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub product_count: i64,
    pub total_stock: i64,
    pub total_stock_value: Decimal,
    pub low_stock_count: i64,
    pub low_stock: Vec<ProductView>,
    pub top_moved: Vec<TurnoverEntry>,
}

/// Products ranked by how often they move
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TurnoverEntry {
    pub product_id: Uuid,
    pub name: String,
    pub movement_count: i64,
    pub total_quantity: i64,
}

/// Purchase totals per supplier (entries only)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierPurchase {
    /// None for movements whose supplier was deleted or never set
    pub supplier_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub movement_count: i64,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

#[derive(Debug, FromRow)]
struct PeriodRow {
    period: NaiveDate,
    total_quantity: i64,
    total_value: Decimal,
}

#[derive(Debug, FromRow)]
struct StockTotals {
    product_count: i64,
    total_stock: i64,
    total_stock_value: Decimal,
    low_stock_count: i64,
}

/// Date window and filters for movement history
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub granularity: Granularity,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub direction: Option<MovementDirection>,
    pub product_id: Option<Uuid>,
}

impl HistoryFilter {
    /// Half-open UTC bounds; the end date is inclusive
    fn bounds(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::Validation {
                    field: "start_date".to_string(),
                    message: "start_date must not be after end_date".to_string(),
                    message_pt: "A data inicial não pode ser posterior à data final".to_string(),
                });
            }
        }
        let start = self.start_date.map(day_start);
        let end = self
            .end_date
            .and_then(|d| d.succ_opt())
            .map(day_start);
        Ok((start, end))
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// LIMIT/OFFSET binds; `None` selects every row
fn window_bounds(window: Option<Pagination>) -> (Option<i64>, Option<i64>) {
    match window {
        Some(page) => (Some(page.limit()), Some(page.offset())),
        None => (None, None),
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: PgPool,
}

impl AnalyticsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardMetrics> {
        let totals = sqlx::query_as::<_, StockTotals>(
            r#"
            SELECT COUNT(*) AS product_count,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_stock,
                   COALESCE(SUM(quantity * unit_value), 0) AS total_stock_value,
                   COUNT(*) FILTER (WHERE quantity <= minimum_quantity) AS low_stock_count
            FROM products
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let preview = Some(Pagination {
            page: 1,
            per_page: DASHBOARD_LIST_LIMIT,
        });
        let (low_stock, _) = self.low_stock(preview).await?;
        let (top_moved, _) = self.turnover(preview).await?;

        Ok(DashboardMetrics {
            product_count: totals.product_count,
            total_stock: totals.total_stock,
            total_stock_value: totals.total_stock_value,
            low_stock_count: totals.low_stock_count,
            low_stock,
            top_moved,
        })
    }

    /// Products at or below their minimum, emptiest first, with the size of
    /// the full set. `window` selects one page; `None` returns every row.
    pub async fn low_stock(&self, window: Option<Pagination>) -> AppResult<(Vec<ProductView>, u64)> {
        let (limit, offset) = window_bounds(window);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE quantity <= minimum_quantity",
        )
        .fetch_one(&self.db)
        .await?;

        let products = sqlx::query_as::<_, ProductView>(
            r#"
            SELECT id, name, normalized_name, quantity, minimum_quantity, unit_value,
                   category, created_at, updated_at
            FROM products
            WHERE quantity <= minimum_quantity
            ORDER BY quantity ASC, normalized_name ASC, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok((products, total as u64))
    }

    /// Every product ranked by number of movements, descending. Products that
    /// never moved rank last with a count of zero.
    pub async fn turnover(&self, window: Option<Pagination>) -> AppResult<(Vec<TurnoverEntry>, u64)> {
        let (limit, offset) = window_bounds(window);

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;

        let entries = sqlx::query_as::<_, TurnoverEntry>(
            r#"
            SELECT p.id AS product_id, p.name,
                   COUNT(m.id) AS movement_count,
                   COALESCE(SUM(m.quantity), 0)::BIGINT AS total_quantity
            FROM products p
            LEFT JOIN movements m ON m.product_id = p.id
            GROUP BY p.id, p.name
            ORDER BY movement_count DESC, total_quantity DESC, p.name ASC, p.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok((entries, total as u64))
    }

    /// Movement totals per period, aggregated in the database
    pub async fn movement_history(&self, filter: &HistoryFilter) -> AppResult<Vec<PeriodTotal>> {
        let (start, end) = filter.bounds()?;

        let rows = sqlx::query_as::<_, PeriodRow>(
            r#"
            SELECT date_trunc($1, created_at AT TIME ZONE 'UTC')::date AS period,
                   SUM(quantity)::BIGINT AS total_quantity,
                   SUM(quantity * unit_price) AS total_value
            FROM movements
            WHERE ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
              AND ($4::movement_direction IS NULL OR direction = $4)
              AND ($5::uuid IS NULL OR product_id = $5)
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(filter.granularity.trunc_unit())
        .bind(start)
        .bind(end)
        .bind(filter.direction)
        .bind(filter.product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PeriodTotal::new(filter.granularity, row.period, row.total_quantity, row.total_value))
            .collect())
    }

    /// Entry totals per supplier, largest spend first
    pub async fn supplier_purchases(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<SupplierPurchase>> {
        let (start, end) = HistoryFilter {
            start_date,
            end_date,
            ..Default::default()
        }
        .bounds()?;

        let purchases = sqlx::query_as::<_, SupplierPurchase>(
            r#"
            SELECT m.supplier_id, s.company_name,
                   COUNT(*) AS movement_count,
                   COALESCE(SUM(m.quantity), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(m.quantity * m.unit_price), 0) AS total_value
            FROM movements m
            LEFT JOIN suppliers s ON s.id = m.supplier_id
            WHERE m.direction = 'ENTRY'
              AND ($1::timestamptz IS NULL OR m.created_at >= $1)
              AND ($2::timestamptz IS NULL OR m.created_at < $2)
            GROUP BY m.supplier_id, s.company_name
            ORDER BY total_value DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(purchases)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
