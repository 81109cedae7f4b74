//! User accounts and profiles

use shared::types::{PaginatedResponse, Pagination};
use shared::{ActivityAction, Actor, AuditedEntity, ProfilePatch, User};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditLogger};
use crate::services::crud::snapshot;

pub const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_staff, is_superuser, is_active, created_at, updated_at, last_login_at";

/// Advisory lock key held while a transaction decides on a username
const USERNAME_LOCK_KEY: i64 = 0x696e_765f_7573_6572;

/// Serialize account writes that depend on which users exist. Released at
/// commit or rollback.
pub async fn lock_usernames(conn: &mut PgConnection) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(USERNAME_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

/// Usernames are unique ignoring case, matching how login looks them up
pub async fn ensure_username_free(
    conn: &mut PgConnection,
    username: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(username)
    .bind(except)
    .fetch_one(conn)
    .await?;

    if taken {
        return Err(AppError::DuplicateEntry("username".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<User>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(users, pagination, total as u64))
    }

    /// Edit the acting user's own profile
    pub async fn update_profile(&self, actor: &Actor, patch: ProfilePatch) -> AppResult<User> {
        patch.validate()?;

        let mut tx = self.db.begin().await?;
        if let Some(username) = &patch.username {
            lock_usernames(&mut *tx).await?;
            ensure_username_free(&mut *tx, username, Some(actor.id)).await?;
        }

        let existing = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let username = patch.username.unwrap_or_else(|| existing.username.clone());
        let email = match patch.email {
            Some(email) if email.trim().is_empty() => None,
            Some(email) => Some(email),
            None => existing.email.clone(),
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $1, email = $2, first_name = $3, last_name = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&username)
        .bind(&email)
        .bind(patch.first_name.unwrap_or_else(|| existing.first_name.clone()))
        .bind(patch.last_name.unwrap_or_else(|| existing.last_name.clone()))
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "username"))?;

        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(Some(actor), ActivityAction::Edit, AuditedEntity::User, user.id)
                .with_details(serde_json::json!({
                    "before": snapshot(&existing),
                    "after": snapshot(&user),
                })),
        )
        .await;
        tx.commit().await?;

        Ok(user)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        if actor.id == id {
            return Err(AppError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let removed = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(Some(actor), ActivityAction::Delete, AuditedEntity::User, id)
                .with_details(snapshot(&removed)),
        )
        .await;
        tx.commit().await?;

        tracing::info!(%id, username = %removed.username, by = %actor.username, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{clerk, CLERK_ID};

    async fn add_user(pool: &PgPool, username: &str) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO users (username, password_hash) VALUES ($1, 'not-a-real-hash')")
            .bind(username)
            .execute(pool)
            .await?;
        Ok(())
    }

    fn rename(username: &str) -> ProfilePatch {
        ProfilePatch {
            username: Some(username.to_string()),
            ..Default::default()
        }
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_rename_to_other_users_name_in_other_case(pool: PgPool) -> anyhow::Result<()> {
        add_user(&pool, "carla").await?;
        let service = UserService::new(pool.clone());

        let err = service.update_profile(&clerk(), rename("CARLA")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "username"));
        assert_eq!(service.get(CLERK_ID).await?.username, "estoquista");
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_rename_changing_only_case(pool: PgPool) -> anyhow::Result<()> {
        let user = UserService::new(pool.clone())
            .update_profile(&clerk(), rename("Estoquista"))
            .await?;
        assert_eq!(user.username, "Estoquista");
        Ok(())
    }

    /// The index backs the check for writers that skip it
    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_case_variant_rejected_by_index(pool: PgPool) -> anyhow::Result<()> {
        let err = add_user(&pool, "ESTOQUISTA").await.unwrap_err();
        assert!(crate::error::is_unique_violation(&err));
        Ok(())
    }
}
