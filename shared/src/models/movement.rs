//! Stock movement models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::positive_decimal;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "movement_direction", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementDirection {
    /// Goods received; increases stock
    Entry,
    /// Goods issued; decreases stock
    Exit,
}

impl MovementDirection {
    pub fn label(&self) -> &'static str {
        match self {
            MovementDirection::Entry => "Entrada",
            MovementDirection::Exit => "Saída",
        }
    }
}

/// A committed stock movement. Movements are never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Movement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub direction: MovementDirection,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

impl Movement {
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Input for recording a movement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub direction: MovementDirection,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Defaults to the product's unit value when absent
    #[validate(custom = "positive_decimal")]
    pub unit_price: Option<Decimal>,
}
