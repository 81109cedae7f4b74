//! Generic create/read/update/delete over audited resources
//!
//! Products and suppliers share the same four operations. Each implements
//! [`Resource`] with its own SQL and validation; [`CrudService`] wraps every
//! mutation in a transaction and appends the matching activity entry.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use shared::types::{PaginatedResponse, Pagination};
use shared::{ActivityAction, Actor, AuditedEntity};
use sqlx::{postgres::PgRow, FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditLogger};

/// A table exposed through the generic CRUD endpoints
#[axum::async_trait]
pub trait Resource:
    Serialize + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + Sized + 'static
{
    /// Body accepted on create
    type Create: DeserializeOwned + Validate + Send + 'static;
    /// Body accepted on update
    type Update: DeserializeOwned + Send + 'static;
    /// Query string accepted on list
    type Filter: DeserializeOwned + Default + Send + Sync + 'static;

    const ENTITY: AuditedEntity;

    fn id(&self) -> Uuid;

    async fn insert(conn: &mut PgConnection, input: Self::Create) -> AppResult<Self>;

    async fn fetch(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>>;

    /// Like `fetch`, holding the row lock until the transaction ends
    async fn fetch_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Self>>;

    /// Merge `patch` into `existing`, validate the result and write it
    async fn update(conn: &mut PgConnection, existing: &Self, patch: Self::Update)
        -> AppResult<Self>;

    async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()>;

    async fn list(
        db: &PgPool,
        filter: &Self::Filter,
        pagination: Pagination,
    ) -> AppResult<(Vec<Self>, u64)>;
}

/// Audit details for a stored record
pub fn snapshot<T: Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or_default()
}

pub struct CrudService<R> {
    db: PgPool,
    _resource: PhantomData<R>,
}

impl<R: Resource> CrudService<R> {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            _resource: PhantomData,
        }
    }

    fn not_found() -> AppError {
        AppError::NotFound(R::ENTITY.as_str().to_string())
    }

    pub async fn list(
        &self,
        filter: &R::Filter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<R>> {
        let (items, total) = R::list(&self.db, filter, pagination).await?;
        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<R> {
        let mut conn = self.db.acquire().await?;
        R::fetch(&mut *conn, id).await?.ok_or_else(Self::not_found)
    }

    pub async fn create(&self, actor: &Actor, input: R::Create) -> AppResult<R> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let record = R::insert(&mut *tx, input).await?;
        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(Some(actor), ActivityAction::Create, R::ENTITY, record.id())
                .with_details(snapshot(&record)),
        )
        .await;
        tx.commit().await?;

        tracing::info!(entity = R::ENTITY.as_str(), id = %record.id(), "Created");
        Ok(record)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, patch: R::Update) -> AppResult<R> {
        let mut tx = self.db.begin().await?;
        let existing = R::fetch_for_update(&mut *tx, id)
            .await?
            .ok_or_else(Self::not_found)?;
        let record = R::update(&mut *tx, &existing, patch).await?;
        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(Some(actor), ActivityAction::Edit, R::ENTITY, id).with_details(
                serde_json::json!({
                    "before": snapshot(&existing),
                    "after": snapshot(&record),
                }),
            ),
        )
        .await;
        tx.commit().await?;

        tracing::info!(entity = R::ENTITY.as_str(), %id, "Updated");
        Ok(record)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let existing = R::fetch_for_update(&mut *tx, id)
            .await?
            .ok_or_else(Self::not_found)?;
        R::delete(&mut *tx, id).await?;
        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(Some(actor), ActivityAction::Delete, R::ENTITY, id)
                .with_details(snapshot(&existing)),
        )
        .await;
        tx.commit().await?;

        tracing::info!(entity = R::ENTITY.as_str(), %id, "Deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MovementService;
    use crate::test_fixtures::{clerk, count_rows, KNIT_ID, SUPPLIER_ID};
    use shared::{MovementDirection, NewMovement, ProductView, Supplier};

    async fn record_purchase(pool: &PgPool) -> anyhow::Result<Uuid> {
        let receipt = MovementService::new(pool.clone())
            .record(
                &clerk(),
                NewMovement {
                    product_id: KNIT_ID,
                    supplier_id: Some(SUPPLIER_ID),
                    direction: MovementDirection::Entry,
                    quantity: 3,
                    unit_price: None,
                },
            )
            .await?;
        Ok(receipt.movement.id)
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_deleting_supplier_keeps_movements(pool: PgPool) -> anyhow::Result<()> {
        let movement_id = record_purchase(&pool).await?;

        CrudService::<Supplier>::new(pool.clone())
            .delete(&clerk(), SUPPLIER_ID)
            .await?;

        let supplier_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT supplier_id FROM movements WHERE id = $1",
        )
        .bind(movement_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(supplier_id, None);
        assert_eq!(
            count_rows(&pool, "SELECT COUNT(*) FROM activity_logs WHERE action = 'DELETE'").await?,
            1
        );
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_deleting_product_removes_its_movements(pool: PgPool) -> anyhow::Result<()> {
        record_purchase(&pool).await?;
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM movements").await?, 1);

        let service = CrudService::<ProductView>::new(pool.clone());
        service.delete(&clerk(), KNIT_ID).await?;

        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM movements").await?, 0);
        assert!(matches!(
            service.get(KNIT_ID).await,
            Err(AppError::NotFound(_))
        ));
        Ok(())
    }
}
