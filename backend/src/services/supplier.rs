//! Supplier registry

use serde::Deserialize;
use shared::types::Pagination;
use shared::{AuditedEntity, Supplier, SupplierCategory, SupplierDraft, SupplierPatch};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::crud::Resource;

const SUPPLIER_COLUMNS: &str =
    "id, company_name, cnpj, phone, address, category, contact_name, email, is_active, created_at";

#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    /// Substring of the company name
    pub q: Option<String>,
    pub category: Option<SupplierCategory>,
    pub is_active: Option<bool>,
}

/// Reject a CNPJ already held by another supplier
async fn ensure_unique_cnpj(
    conn: &mut PgConnection,
    cnpj: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM suppliers WHERE cnpj = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(cnpj)
    .bind(except)
    .fetch_one(conn)
    .await?;

    if taken {
        return Err(AppError::DuplicateEntry("cnpj".to_string()));
    }
    Ok(())
}

#[axum::async_trait]
impl Resource for Supplier {
    type Create = SupplierDraft;
    type Update = SupplierPatch;
    type Filter = SupplierFilter;

    const ENTITY: AuditedEntity = AuditedEntity::Supplier;

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(conn: &mut PgConnection, input: SupplierDraft) -> AppResult<Self> {
        let draft = input.normalized();
        ensure_unique_cnpj(&mut *conn, &draft.cnpj, None).await?;

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (company_name, cnpj, phone, address, category, contact_name, email, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&draft.company_name)
        .bind(&draft.cnpj)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(draft.category)
        .bind(&draft.contact_name)
        .bind(&draft.email)
        .bind(draft.is_active)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::from_db(e, "cnpj"))
    }

    async fn fetch(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(supplier)
    }

    async fn fetch_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(supplier)
    }

    async fn update(
        conn: &mut PgConnection,
        existing: &Self,
        patch: SupplierPatch,
    ) -> AppResult<Self> {
        let draft = patch.merge(existing);
        draft.validate()?;
        if draft.cnpj != existing.cnpj {
            ensure_unique_cnpj(&mut *conn, &draft.cnpj, Some(existing.id)).await?;
        }

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET company_name = $1, cnpj = $2, phone = $3, address = $4, category = $5,
                contact_name = $6, email = $7, is_active = $8
            WHERE id = $9
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&draft.company_name)
        .bind(&draft.cnpj)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(draft.category)
        .bind(&draft.contact_name)
        .bind(&draft.email)
        .bind(draft.is_active)
        .bind(existing.id)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::from_db(e, "cnpj"))
    }

    async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        // Movements keep their history; the FK nulls supplier_id
        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn list(
        db: &PgPool,
        filter: &SupplierFilter,
        pagination: Pagination,
    ) -> AppResult<(Vec<Self>, u64)> {
        let q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let predicate = r#"
            ($1::text IS NULL OR company_name ILIKE '%' || $1 || '%')
            AND ($2::supplier_category IS NULL OR category = $2)
            AND ($3::boolean IS NULL OR is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM suppliers WHERE {predicate}"
        ))
        .bind(q)
        .bind(filter.category)
        .bind(filter.is_active)
        .fetch_one(db)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM suppliers
            WHERE {predicate}
            ORDER BY company_name, id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(q)
        .bind(filter.category)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(db)
        .await?;

        Ok((suppliers, total as u64))
    }
}
