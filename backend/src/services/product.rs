//! Product catalogue service

use serde::Deserialize;
use shared::types::{Pagination, SortDirection};
use shared::{
    fold, ActivityAction, Actor, AuditedEntity, ProductCategory, ProductDraft, ProductPatch,
    ProductView,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditLogger};
use crate::services::crud::{snapshot, Resource};

/// Text the user must send to confirm a bulk delete
pub const BULK_DELETE_CONFIRMATION: &str = "SIM";

/// Autocomplete result size
pub const SEARCH_LIMIT: i64 = 10;

const PRODUCT_COLUMNS: &str =
    "id, name, normalized_name, quantity, minimum_quantity, unit_value, category, created_at, updated_at";

/// Sortable product columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Name,
    Quantity,
    UnitValue,
    Category,
}

impl ProductSort {
    fn column(&self) -> &'static str {
        match self {
            ProductSort::Name => "normalized_name",
            ProductSort::Quantity => "quantity",
            ProductSort::UnitValue => "unit_value",
            ProductSort::Category => "category",
        }
    }
}

/// Product list query
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Matches the name (accents and case ignored) or the category
    pub q: Option<String>,
    pub category: Option<ProductCategory>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub dir: SortDirection,
}

impl ProductFilter {
    fn search_terms(&self) -> (Option<String>, Option<String>) {
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => (Some(fold(q)), Some(q.to_string())),
            None => (None, None),
        }
    }

    fn order_by(&self) -> String {
        format!("{} {}, id", self.sort.column(), self.dir.as_sql())
    }
}

/// Write a new product row. Shared by the CRUD create and the importer.
pub async fn insert_product(conn: &mut PgConnection, draft: &ProductDraft) -> Result<ProductView, sqlx::Error> {
    sqlx::query_as::<_, ProductView>(&format!(
        r#"
        INSERT INTO products (name, normalized_name, quantity, minimum_quantity, unit_value, category)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&draft.name)
    .bind(draft.normalized_name())
    .bind(draft.quantity)
    .bind(draft.minimum_quantity)
    .bind(draft.unit_value)
    .bind(draft.category)
    .fetch_one(conn)
    .await
}

#[axum::async_trait]
impl Resource for ProductView {
    type Create = ProductDraft;
    type Update = ProductPatch;
    type Filter = ProductFilter;

    const ENTITY: AuditedEntity = AuditedEntity::Product;

    fn id(&self) -> Uuid {
        self.product.id
    }

    async fn insert(conn: &mut PgConnection, input: ProductDraft) -> AppResult<Self> {
        Ok(insert_product(conn, &input).await?)
    }

    async fn fetch(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>> {
        let product = sqlx::query_as::<_, ProductView>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(product)
    }

    async fn fetch_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>> {
        let product = sqlx::query_as::<_, ProductView>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(product)
    }

    async fn update(
        conn: &mut PgConnection,
        existing: &Self,
        patch: ProductPatch,
    ) -> AppResult<Self> {
        patch.validate()?;
        // Stock is owned by the ledger; only an explicit correction overwrites it
        let quantity = patch.quantity;
        let draft = patch.merge(&existing.product);
        draft.validate()?;

        let product = sqlx::query_as::<_, ProductView>(&format!(
            r#"
            UPDATE products
            SET name = $1, normalized_name = $2, quantity = COALESCE($3, quantity), minimum_quantity = $4,
                unit_value = $5, category = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(draft.normalized_name())
        .bind(quantity)
        .bind(draft.minimum_quantity)
        .bind(draft.unit_value)
        .bind(draft.category)
        .bind(existing.product.id)
        .fetch_one(conn)
        .await?;

        if product.low_stock {
            tracing::warn!(id = %product.product.id, quantity = product.product.quantity, "Product at or below minimum stock");
        }
        Ok(product)
    }

    async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn list(
        db: &PgPool,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> AppResult<(Vec<Self>, u64)> {
        let (folded, raw) = filter.search_terms();
        let predicate = r#"
            ($1::text IS NULL
                OR normalized_name LIKE '%' || $1 || '%'
                OR name ILIKE '%' || $2 || '%'
                OR category::text ILIKE '%' || $2 || '%')
            AND ($3::product_category IS NULL OR category = $3)
            AND (NOT $4 OR quantity <= minimum_quantity)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products WHERE {predicate}"
        ))
        .bind(&folded)
        .bind(&raw)
        .bind(filter.category)
        .bind(filter.low_stock)
        .fetch_one(db)
        .await?;

        let products = sqlx::query_as::<_, ProductView>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE {predicate}
            ORDER BY {order}
            LIMIT $5 OFFSET $6
            "#,
            order = filter.order_by(),
        ))
        .bind(&folded)
        .bind(&raw)
        .bind(filter.category)
        .bind(filter.low_stock)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(db)
        .await?;

        Ok((products, total as u64))
    }
}

/// Product operations beyond plain CRUD
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Names containing `term`, ignoring accents and case
    pub async fn search_names(&self, term: &str) -> AppResult<Vec<String>> {
        let term = fold(term.trim());
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT name FROM products
            WHERE normalized_name LIKE '%' || $1 || '%'
            ORDER BY normalized_name
            LIMIT $2
            "#,
        )
        .bind(&term)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(names)
    }

    /// Delete every product after an explicit confirmation. One DELETE entry per product.
    pub async fn delete_all(&self, actor: &Actor, confirmation: &str) -> AppResult<u64> {
        if confirmation.trim() != BULK_DELETE_CONFIRMATION {
            return Err(AppError::Validation {
                field: "confirmation".to_string(),
                message: format!("Type {} to confirm deleting all products", BULK_DELETE_CONFIRMATION),
                message_pt: format!("Digite {} para confirmar a exclusão de todos os produtos", BULK_DELETE_CONFIRMATION),
            });
        }

        let mut tx = self.db.begin().await?;
        let removed = sqlx::query_as::<_, ProductView>(&format!(
            "DELETE FROM products RETURNING {PRODUCT_COLUMNS}"
        ))
        .fetch_all(&mut *tx)
        .await?;

        for product in &removed {
            AuditLogger::record(
                &mut *tx,
                AuditEntry::new(Some(actor), ActivityAction::Delete, AuditedEntity::Product, product.product.id)
                    .with_details(snapshot(product)),
            )
            .await;
        }
        tx.commit().await?;

        tracing::warn!(count = removed.len(), user = %actor.username, "All products deleted");
        Ok(removed.len() as u64)
    }
}
