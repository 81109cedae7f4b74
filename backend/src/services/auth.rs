//! Accounts and sessions: registration, username/password login and
//! refresh-token rotation

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::{ActivityAction, AuditedEntity, RegisterUserInput, User};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;
use crate::services::audit::{AuditEntry, AuditLogger};
use crate::services::crud::snapshot;
use crate::services::user::{ensure_username_free, lock_usernames, USER_COLUMNS};

#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Bearer access token plus the refresh token that can renew it
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Credentials row
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    password_hash: String,
    is_active: bool,
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Create an account. The very first account becomes the superuser.
    pub async fn register(&self, input: RegisterUserInput) -> AppResult<RegisterResponse> {
        input.validate()?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let email = input.email.filter(|e| !e.trim().is_empty());

        let mut tx = self.db.begin().await?;

        // Held until commit so concurrent registrations see each other
        lock_usernames(&mut *tx).await?;
        ensure_username_free(&mut *tx, &input.username, None).await?;

        let is_first = !sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&mut *tx)
            .await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&email)
        .bind(&password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(is_first)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "username"))?;

        AuditLogger::record(
            &mut *tx,
            AuditEntry::new(None, ActivityAction::Create, AuditedEntity::User, user.id)
                .with_details(snapshot(&user)),
        )
        .await;

        tx.commit().await?;

        if is_first {
            tracing::info!(username = %user.username, "First account registered as superuser");
        }

        let tokens = self.issue_tokens(&user).await?;
        Ok(RegisterResponse { user, tokens })
    }

    /// Authenticate user with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthTokens> {
        let credentials = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash, is_active FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !credentials.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_pt: "A conta está desativada".to_string(),
            });
        }

        let valid = verify(password, &credentials.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::warn!(username, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(credentials.id)
        .fetch_one(&self.db)
        .await?;

        self.issue_tokens(&user).await
    }

    /// Exchange a refresh token for a new token pair. The old refresh token is revoked.
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE u.id = rt.user_id
              AND rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            RETURNING rt.user_id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: "Invalid or expired refresh token".to_string(),
            message_pt: "Token de atualização inválido ou expirado".to_string(),
        })?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        self.issue_tokens(&user).await
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let tokens = self.generate_tokens(user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;
        Ok(tokens)
    }

    /// Sign an access token for `user` and mint a fresh refresh token
    fn generate_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Only the SHA-256 of the token is persisted
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(Self::hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// SHA-256 hex digest; only the digest is stored
    fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_jwt;

    fn service() -> AuthService {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/inventory_test")
            .unwrap();
        AuthService {
            db,
            jwt_secret: "test-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        }
    }

    fn user(is_staff: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "carla".to_string(),
            email: None,
            first_name: "Carla".to_string(),
            last_name: String::new(),
            is_staff,
            is_superuser: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let digest = AuthService::hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(AuthService::hash_token("abc"), digest);
        assert_ne!(AuthService::hash_token("abd"), digest);
    }

    #[tokio::test]
    async fn test_generated_token_round_trips_claims() {
        let service = service();
        let user = user(true);
        let tokens = service.generate_tokens(&user).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);

        let claims = decode_jwt(&tokens.access_token, "test-secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "carla");
        assert!(claims.is_staff);
        assert!(!claims.is_superuser);
    }

    fn registration(username: &str) -> RegisterUserInput {
        RegisterUserInput {
            username: username.to_string(),
            email: None,
            password: "estoque2024".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_first_registrations_one_superuser(pool: PgPool) -> anyhow::Result<()> {
        let service = AuthService {
            db: pool.clone(),
            ..service()
        };

        let (ana, bruno) = tokio::join!(
            service.register(registration("ana")),
            service.register(registration("bruno")),
        );
        let (ana, bruno) = (ana?, bruno?);

        assert!(ana.user.is_superuser ^ bruno.user.is_superuser);
        let superusers = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_superuser")
            .fetch_one(&pool)
            .await?;
        assert_eq!(superusers, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("inventory")))]
    async fn test_register_rejects_name_in_other_case(pool: PgPool) -> anyhow::Result<()> {
        let service = AuthService {
            db: pool,
            ..service()
        };
        let err = service.register(registration("EstoQuista")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "username"));
        Ok(())
    }
}
