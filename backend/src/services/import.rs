//! Spreadsheet product import
//!
//! The whole run is one transaction. Each accepted row is inserted under its
//! own savepoint, so a row the database refuses is reported like a validation
//! failure and the rest of the batch still commits.

use serde::Serialize;
use shared::import::{is_blank_row, sheet_row_number, ColumnMap, ImportReport, RowError};
use shared::spreadsheet::{Sheet, SheetFormat};
use shared::{ActivityAction, Actor, AuditedEntity, ProductDraft, ProductView};
use sqlx::{Connection, PgConnection, PgPool};

use crate::error::{is_row_level, AppResult};
use crate::services::audit::{AuditEntry, AuditLogger};
use crate::services::crud::snapshot;
use crate::services::product::insert_product;

/// Body returned to the uploader
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success_count: usize,
    pub errors: Vec<RowError>,
    pub message: String,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        Self {
            message: report.summary(),
            success_count: report.success_count,
            errors: report.errors,
        }
    }
}

#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
}

impl ImportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Import products from an uploaded XLSX or CSV file
    pub async fn import_products(
        &self,
        actor: &Actor,
        filename: &str,
        bytes: &[u8],
    ) -> AppResult<ImportReport> {
        let format = SheetFormat::from_filename(filename)?;
        let sheet = Sheet::parse(bytes, format)?;
        let columns = ColumnMap::resolve(&sheet.headers)?;

        tracing::info!(
            filename,
            rows = sheet.rows.len(),
            user = %actor.username,
            "Starting product import"
        );

        let mut report = ImportReport::default();
        let mut tx = self.db.begin().await?;

        for (index, row) in sheet.rows.iter().enumerate() {
            if is_blank_row(row) {
                continue;
            }
            let line = sheet_row_number(index);

            let draft = match columns.validate_row(row) {
                Ok(draft) => draft,
                Err(failure) => {
                    tracing::warn!(line, "Import row rejected: {}", failure);
                    report.record_failure(line, failure, columns.row_data(row));
                    continue;
                }
            };

            match Self::insert_row(&mut *tx, &draft).await {
                Ok(product) => {
                    AuditLogger::record(
                        &mut *tx,
                        AuditEntry::new(
                            Some(actor),
                            ActivityAction::Create,
                            AuditedEntity::Product,
                            product.product.id,
                        )
                        .with_details(snapshot(&product)),
                    )
                    .await;
                    report.record_success();
                }
                Err(err) if is_row_level(&err) => {
                    let message = err
                        .as_database_error()
                        .map(|db| db.message().to_string())
                        .unwrap_or_else(|| err.to_string());
                    tracing::warn!(line, "Import row refused by database: {}", message);
                    report.record_failure(line, message, columns.row_data(row));
                }
                Err(err) => return Err(err.into()),
            }
        }

        if report.success_count > 0 {
            AuditLogger::record(
                &mut *tx,
                AuditEntry::new(Some(actor), ActivityAction::Import, AuditedEntity::Product, "")
                    .with_details(serde_json::json!({
                        "filename": filename,
                        "success_count": report.success_count,
                        "error_count": report.errors.len(),
                    }))
                    .with_description(format!("Imported {} products", report.success_count)),
            )
            .await;
        }

        tx.commit().await?;

        tracing::info!(
            success = report.success_count,
            failed = report.errors.len(),
            "Product import finished"
        );
        Ok(report)
    }

    async fn insert_row(
        conn: &mut PgConnection,
        draft: &ProductDraft,
    ) -> Result<ProductView, sqlx::Error> {
        let mut savepoint = conn.begin().await?;
        let product = insert_product(&mut *savepoint, draft).await?;
        savepoint.commit().await?;
        Ok(product)
    }
}
