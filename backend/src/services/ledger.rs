//! Stock ledger
//!
//! Keeps `products.quantity` consistent with the movements recorded against
//! it. The change is applied by one conditional `UPDATE`, so concurrent
//! movements on the same product serialize on the row lock and stock never
//! goes below zero.

use shared::ledger::{StockError, StockLevel};
use shared::MovementDirection;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{is_numeric_overflow, AppError, AppResult};

pub struct StockLedger;

impl StockLedger {
    /// Apply one movement to its product and return the resulting level.
    ///
    /// Must run in the transaction that inserts the movement; an error here
    /// rolls the movement back with it.
    pub async fn apply_movement(
        conn: &mut PgConnection,
        product_id: Uuid,
        direction: MovementDirection,
        quantity: i32,
    ) -> AppResult<StockLevel> {
        let delta = direction.delta(quantity)?;

        let updated = sqlx::query_as::<_, (i32, i32)>(
            r#"
            UPDATE products
            SET quantity = quantity + $1, updated_at = NOW()
            WHERE id = $2 AND quantity + $1 >= 0
            RETURNING quantity, minimum_quantity
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|err| {
            if is_numeric_overflow(&err) {
                tracing::warn!(%product_id, delta, "Stock quantity would overflow");
                AppError::from(StockError::Overflow)
            } else {
                AppError::from(err)
            }
        })?;

        if let Some((quantity, minimum_quantity)) = updated {
            let level = StockLevel::new(quantity, minimum_quantity);
            tracing::info!(
                %product_id,
                ?direction,
                delta,
                quantity = level.quantity,
                low_stock = level.is_low(),
                "Stock updated"
            );
            return Ok(level);
        }

        // Nothing updated: either the product is gone or the exit exceeds stock
        let current = sqlx::query_as::<_, (i32, i32)>(
            "SELECT quantity, minimum_quantity FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let level = StockLevel::new(current.0, current.1);
        match level.apply(direction, quantity) {
            Err(err @ StockError::InsufficientStock { .. }) => {
                tracing::warn!(%product_id, available = level.quantity, requested = quantity, "Insufficient stock");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
            Ok(_) => Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Stock changed concurrently, please retry".to_string(),
                message_pt: "O estoque foi alterado simultaneamente, tente novamente".to_string(),
            }),
        }
    }
}
