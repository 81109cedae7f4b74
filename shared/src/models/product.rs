//! Product catalogue models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::StockLevel;
use crate::normalize::fold;
use crate::validation::non_negative_decimal;

/// Minimum quantity applied when none is given
pub const DEFAULT_MINIMUM_QUANTITY: i32 = 5;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "product_category", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Tecidos,
    Sublimacao,
    Transfer,
    #[default]
    Outros,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::Tecidos,
        ProductCategory::Sublimacao,
        ProductCategory::Transfer,
        ProductCategory::Outros,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ProductCategory::Tecidos => "TECIDOS",
            ProductCategory::Sublimacao => "SUBLIMACAO",
            ProductCategory::Transfer => "TRANSFER",
            ProductCategory::Outros => "OUTROS",
        }
    }

    /// Human label as shown to users
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Tecidos => "Tecidos",
            ProductCategory::Sublimacao => "Sublimação",
            ProductCategory::Transfer => "Transfer",
            ProductCategory::Outros => "Outros",
        }
    }

    /// Match free text against codes and labels, ignoring case and accents.
    /// Spreadsheets carry either form ("SUBLIMAÇÃO", "Sublimação", "sublimacao").
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let folded = fold(text.trim());
        Self::ALL
            .into_iter()
            .find(|c| fold(c.code()) == folded || fold(c.label()) == folded)
    }
}

/// A product held in stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Always `fold(name)`; written together with `name`
    pub normalized_name: String,
    pub quantity: i32,
    pub minimum_quantity: i32,
    pub unit_value: Decimal,
    pub category: ProductCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::new(self.quantity, self.minimum_quantity)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_level().is_low()
    }

    /// Value of the stock on hand
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_value
    }
}

/// Product as returned by the API, with derived fields
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_label: &'static str,
    pub low_stock: bool,
    pub stock_value: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            category_label: product.category.label(),
            low_stock: product.is_low_stock(),
            stock_value: product.stock_value(),
            product,
        }
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductView {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        <Product as sqlx::FromRow<'r, sqlx::postgres::PgRow>>::from_row(row).map(ProductView::from)
    }
}

fn default_minimum_quantity() -> i32 {
    DEFAULT_MINIMUM_QUANTITY
}

/// Values needed to write a product row
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default = "default_minimum_quantity")]
    #[validate(range(min = 1, message = "Minimum quantity must be at least 1"))]
    pub minimum_quantity: i32,
    #[serde(default)]
    #[validate(custom = "non_negative_decimal")]
    pub unit_value: Decimal,
    #[serde(default)]
    pub category: ProductCategory,
}

impl ProductDraft {
    /// Normalized name to store alongside `name`
    pub fn normalized_name(&self) -> String {
        fold(&self.name)
    }
}

/// Partial product update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 1, message = "Minimum quantity must be at least 1"))]
    pub minimum_quantity: Option<i32>,
    #[validate(custom = "non_negative_decimal")]
    pub unit_value: Option<Decimal>,
    pub category: Option<ProductCategory>,
}

impl ProductPatch {
    pub fn merge(self, existing: &Product) -> ProductDraft {
        ProductDraft {
            name: self.name.unwrap_or_else(|| existing.name.clone()),
            quantity: self.quantity.unwrap_or(existing.quantity),
            minimum_quantity: self.minimum_quantity.unwrap_or(existing.minimum_quantity),
            unit_value: self.unit_value.unwrap_or(existing.unit_value),
            category: self.category.unwrap_or(existing.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i32, minimum_quantity: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Papel Sublimático A4".to_string(),
            normalized_name: fold("Papel Sublimático A4"),
            quantity,
            minimum_quantity,
            unit_value: Decimal::new(1250, 2),
            category: ProductCategory::Sublimacao,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 1).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(product(4, 1).stock_value(), Decimal::new(5000, 2));
    }

    #[test]
    fn test_category_parse_lenient() {
        assert_eq!(
            ProductCategory::parse_lenient("SUBLIMAÇÃO"),
            Some(ProductCategory::Sublimacao)
        );
        assert_eq!(
            ProductCategory::parse_lenient(" tecidos "),
            Some(ProductCategory::Tecidos)
        );
        assert_eq!(ProductCategory::parse_lenient("Outros"), Some(ProductCategory::Outros));
        assert_eq!(ProductCategory::parse_lenient("vinil"), None);
    }

    #[test]
    fn test_draft_defaults_from_json() {
        let draft: ProductDraft = serde_json::from_str(r#"{"name": "Tinta"}"#).unwrap();
        assert_eq!(draft.quantity, 0);
        assert_eq!(draft.minimum_quantity, DEFAULT_MINIMUM_QUANTITY);
        assert_eq!(draft.category, ProductCategory::Outros);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_rejects_out_of_range() {
        let mut draft: ProductDraft = serde_json::from_str(r#"{"name": "Tinta"}"#).unwrap();
        draft.minimum_quantity = 0;
        assert!(draft.validate().is_err());

        draft.minimum_quantity = 1;
        draft.unit_value = Decimal::new(-1, 2);
        assert!(draft.validate().is_err());

        draft.unit_value = Decimal::ZERO;
        draft.name = String::new();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_patch_merge_keeps_unset_fields() {
        let existing = product(10, 3);
        let draft = ProductPatch {
            name: Some("Tecido Oxford".to_string()),
            ..Default::default()
        }
        .merge(&existing);

        assert_eq!(draft.name, "Tecido Oxford");
        assert_eq!(draft.normalized_name(), "tecido oxford");
        assert_eq!(draft.quantity, 10);
        assert_eq!(draft.minimum_quantity, 3);
        assert_eq!(draft.category, ProductCategory::Sublimacao);
    }

    #[test]
    fn test_view_carries_derived_fields() {
        let view = ProductView::from(product(2, 5));
        assert!(view.low_stock);
        assert_eq!(view.category_label, "Sublimação");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["low_stock"], true);
        assert_eq!(json["category"], "SUBLIMACAO");
    }
}
