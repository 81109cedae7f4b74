//! Stock movement service
//!
//! Recording a movement inserts the row and applies it to the product's stock
//! in one transaction. Movements are immutable afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::StockReport;
use shared::types::{PaginatedResponse, Pagination};
use shared::{Actor, Movement, MovementDirection, NewMovement};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::StockLedger;

const MOVEMENT_COLUMNS: &str =
    "id, product_id, supplier_id, direction, quantity, unit_price, created_at, user_id";

/// Movement list filters
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub direction: Option<MovementDirection>,
}

/// A recorded movement with the stock level it produced
#[derive(Debug, Serialize)]
pub struct MovementReceipt {
    pub movement: Movement,
    pub total_value: Decimal,
    pub stock: StockReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MovementReceipt {
    fn new(movement: Movement, product_name: &str, stock: StockReport) -> Self {
        let warning = stock.low_stock.then(|| {
            format!(
                "Low stock for {}: {} on hand (minimum {})",
                product_name, stock.quantity, stock.minimum_quantity
            )
        });
        Self {
            total_value: movement.total_value(),
            movement,
            stock,
            warning,
        }
    }
}

#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

impl MovementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a movement and apply it to stock
    pub async fn record(&self, actor: &Actor, input: NewMovement) -> AppResult<MovementReceipt> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let (product_name, unit_value) = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT name, unit_value FROM products WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if let Some(supplier_id) = input.supplier_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
            )
            .bind(supplier_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }

        let unit_price = input.unit_price.unwrap_or(unit_value);
        if unit_price <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_price".to_string(),
                message: "Unit price must be greater than zero".to_string(),
                message_pt: "O preço unitário deve ser maior que zero".to_string(),
            });
        }

        let movement = sqlx::query_as::<_, Movement>(&format!(
            r#"
            INSERT INTO movements (product_id, supplier_id, direction, quantity, unit_price, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(input.product_id)
        .bind(input.supplier_id)
        .bind(input.direction)
        .bind(input.quantity)
        .bind(unit_price)
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await?;

        let level = StockLedger::apply_movement(
            &mut *tx,
            movement.product_id,
            movement.direction,
            movement.quantity,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            id = %movement.id,
            product_id = %movement.product_id,
            direction = movement.direction.label(),
            quantity = movement.quantity,
            user = %actor.username,
            "Movement recorded"
        );

        Ok(MovementReceipt::new(movement, &product_name, level.into()))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Movement> {
        sqlx::query_as::<_, Movement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))
    }

    /// Newest first
    pub async fn list(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Movement>> {
        let predicate = r#"
            ($1::uuid IS NULL OR product_id = $1)
            AND ($2::movement_direction IS NULL OR direction = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM movements WHERE {predicate}"
        ))
        .bind(filter.product_id)
        .bind(filter.direction)
        .fetch_one(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE {predicate}
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.direction)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(movements, pagination, total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn movement(direction: MovementDirection, quantity: i32) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            supplier_id: None,
            direction,
            quantity,
            unit_price: Decimal::new(250, 2),
            created_at: Utc::now(),
            user_id: None,
        }
    }

    #[test]
    fn test_receipt_warns_on_low_stock() {
        let stock = StockReport {
            quantity: 2,
            minimum_quantity: 5,
            low_stock: true,
        };
        let receipt = MovementReceipt::new(movement(MovementDirection::Exit, 8), "Tinta Ciano", stock);
        assert_eq!(receipt.total_value, Decimal::new(2000, 2));
        assert_eq!(
            receipt.warning.as_deref(),
            Some("Low stock for Tinta Ciano: 2 on hand (minimum 5)")
        );
    }

    #[test]
    fn test_receipt_without_warning() {
        let stock = StockReport {
            quantity: 40,
            minimum_quantity: 5,
            low_stock: false,
        };
        let receipt = MovementReceipt::new(movement(MovementDirection::Entry, 40), "Tinta Ciano", stock);
        assert!(receipt.warning.is_none());
    }
}
