//! Activity (audit) log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of change recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "activity_action", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Edit,
    Delete,
    Import,
}

impl ActivityAction {
    /// Lowercase verb used in generated descriptions
    pub fn verb(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Edit => "edit",
            ActivityAction::Delete => "delete",
            ActivityAction::Import => "import",
        }
    }
}

/// Entity types whose changes are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditedEntity {
    Product,
    Supplier,
    User,
}

impl AuditedEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditedEntity::Product => "Product",
            AuditedEntity::Supplier => "Supplier",
            AuditedEntity::User => "User",
        }
    }
}

/// The user on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
}

/// A row of the activity log, with the acting username joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
    pub description: String,
}

/// Build the default human description of an activity
pub fn describe_activity(actor: Option<&Actor>, action: ActivityAction, entity_type: &str) -> String {
    let who = actor.map(|a| a.username.as_str()).unwrap_or("System");
    format!("{} performed {} on {}", who, action.verb(), entity_type)
}
