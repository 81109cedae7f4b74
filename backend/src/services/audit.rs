//! Activity (audit) log
//!
//! Writes go through [`AuditLogger::record`], which runs inside a savepoint of
//! the caller's transaction. A failed audit insert is logged and discarded so
//! the mutation it describes still commits. Reads are staff-only listings.

use serde::Deserialize;
use serde_json::Value;
use shared::types::{PaginatedResponse, Pagination};
use shared::{describe_activity, ActivityAction, ActivityLog, Actor, AuditedEntity};
use sqlx::{Connection, PgConnection, PgPool};

use crate::error::AppResult;

/// One activity to append
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub actor: Option<&'a Actor>,
    pub action: ActivityAction,
    pub entity_type: &'a str,
    pub entity_id: String,
    pub details: Value,
    pub description: Option<String>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(
        actor: Option<&'a Actor>,
        action: ActivityAction,
        entity: AuditedEntity,
        entity_id: impl ToString,
    ) -> Self {
        Self {
            actor,
            action,
            entity_type: entity.as_str(),
            entity_id: entity_id.to_string(),
            details: Value::Object(Default::default()),
            description: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| describe_activity(self.actor, self.action, self.entity_type))
    }
}

/// Append-only writer for the activity log
pub struct AuditLogger;

impl AuditLogger {
    /// Record an activity. Never fails the caller.
    pub async fn record(conn: &mut PgConnection, entry: AuditEntry<'_>) {
        if let Err(err) = Self::insert(conn, &entry).await {
            tracing::error!(
                action = ?entry.action,
                entity_type = entry.entity_type,
                entity_id = %entry.entity_id,
                "Failed to write activity log: {}",
                err
            );
        }
    }

    async fn insert(conn: &mut PgConnection, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error> {
        let mut savepoint = conn.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, entity_type, entity_id, details, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.actor.map(|a| a.id))
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(entry.description())
        .execute(&mut *savepoint)
        .await?;

        savepoint.commit().await
    }
}

/// Listing filters for the activity log
#[derive(Debug, Default, Deserialize)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub action: Option<ActivityAction>,
}

/// Read side of the activity log
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Newest first
    pub async fn list(
        &self,
        filter: &ActivityFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<ActivityLog>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM activity_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::activity_action IS NULL OR action = $2)
            "#,
        )
        .bind(&filter.entity_type)
        .bind(filter.action)
        .fetch_one(&self.db)
        .await?;

        let entries = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT a.id, a.user_id, u.username, a.created_at, a.action,
                   a.entity_type, a.entity_id, a.details, a.description
            FROM activity_logs a
            LEFT JOIN users u ON u.id = a.user_id
            WHERE ($1::text IS NULL OR a.entity_type = $1)
              AND ($2::activity_action IS NULL OR a.action = $2)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.entity_type)
        .bind(filter.action)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(entries, pagination, total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_description_defaults_to_generated_text() {
        let actor = Actor {
            id: Uuid::new_v4(),
            username: "maria".to_string(),
        };
        let entry = AuditEntry::new(
            Some(&actor),
            ActivityAction::Delete,
            AuditedEntity::Supplier,
            Uuid::nil(),
        );
        assert_eq!(entry.description(), "maria performed delete on Supplier");

        let entry = entry.with_description("Removed duplicate supplier");
        assert_eq!(entry.description(), "Removed duplicate supplier");
    }

    #[test]
    fn test_system_entry_has_no_actor() {
        let entry = AuditEntry::new(None, ActivityAction::Import, AuditedEntity::Product, "");
        assert_eq!(entry.description(), "System performed import on Product");
        assert!(entry.details.as_object().is_some_and(|d| d.is_empty()));
    }
}
