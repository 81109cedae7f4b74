//! Stock ledger rules
//!
//! The backend applies movements with a single conditional `UPDATE` so the
//! database serializes concurrent writers. This module holds the same rule in
//! pure form: the signed delta a movement contributes, the non-negativity
//! check, and the derived low-stock flag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MovementDirection;

/// Reasons the ledger refuses a movement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("movement quantity must be positive, got {0}")]
    NonPositiveQuantity(i32),

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("stock quantity overflow")]
    Overflow,
}

impl MovementDirection {
    /// Signed change a movement of `quantity` makes to stock on hand
    pub fn delta(&self, quantity: i32) -> Result<i32, StockError> {
        if quantity <= 0 {
            return Err(StockError::NonPositiveQuantity(quantity));
        }
        Ok(match self {
            MovementDirection::Entry => quantity,
            MovementDirection::Exit => -quantity,
        })
    }
}

/// Stock on hand for a product together with its reorder threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i32,
    pub minimum_quantity: i32,
}

impl StockLevel {
    pub fn new(quantity: i32, minimum_quantity: i32) -> Self {
        Self {
            quantity,
            minimum_quantity,
        }
    }

    /// Low stock means at or below the minimum
    pub fn is_low(&self) -> bool {
        self.quantity <= self.minimum_quantity
    }

    /// Apply a movement. On refusal the level is left untouched.
    pub fn apply(&self, direction: MovementDirection, quantity: i32) -> Result<StockLevel, StockError> {
        let delta = direction.delta(quantity)?;
        let next = self.quantity.checked_add(delta).ok_or(StockError::Overflow)?;
        if next < 0 {
            return Err(StockError::InsufficientStock {
                available: self.quantity,
                requested: quantity,
            });
        }
        Ok(StockLevel::new(next, self.minimum_quantity))
    }
}

/// Stock level after a ledger update, as reported to callers
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StockReport {
    pub quantity: i32,
    pub minimum_quantity: i32,
    pub low_stock: bool,
}

impl From<StockLevel> for StockReport {
    fn from(level: StockLevel) -> Self {
        Self {
            quantity: level.quantity,
            minimum_quantity: level.minimum_quantity,
            low_stock: level.is_low(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_increases() {
        let level = StockLevel::new(10, 5).apply(MovementDirection::Entry, 7).unwrap();
        assert_eq!(level.quantity, 17);
        assert!(!level.is_low());
    }

    #[test]
    fn test_exit_to_zero_allowed() {
        let level = StockLevel::new(4, 1).apply(MovementDirection::Exit, 4).unwrap();
        assert_eq!(level.quantity, 0);
        assert!(level.is_low());
    }

    #[test]
    fn test_exit_beyond_stock_refused() {
        let level = StockLevel::new(3, 1);
        let err = level.apply(MovementDirection::Exit, 4).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
    }

    #[test]
    fn test_non_positive_quantity_refused() {
        assert_eq!(
            MovementDirection::Entry.delta(0),
            Err(StockError::NonPositiveQuantity(0))
        );
        assert!(StockLevel::new(3, 1).apply(MovementDirection::Exit, -2).is_err());
    }

    #[test]
    fn test_overflow_refused() {
        let level = StockLevel::new(i32::MAX, 1);
        assert_eq!(level.apply(MovementDirection::Entry, 1), Err(StockError::Overflow));
    }

    #[test]
    fn test_report_flags_low_stock() {
        let report = StockReport::from(StockLevel::new(5, 5));
        assert!(report.low_stock);
    }
}
