use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict("Email is already in use".into())
            }
            _ => StoreError::Backend(e.into()),
        }
    }
}

/// Persistent table of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// The user whose stored reset token equals `token` and has not expired at `not_expired_at`.
    async fn find_by_reset_token(
        &self,
        id: Uuid,
        token: &str,
        not_expired_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Newest first, optionally filtered on the verified flag.
    async fn list(&self, verified: Option<bool>) -> Result<Vec<User>, StoreError>;

    async fn create(&self, new: NewUser) -> Result<User, StoreError>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError>;

    /// Sets the new hash and clears the reset grant in one step, only if the grant still
    /// matches `token` and is unexpired at `now`. Returns whether a row was changed.
    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, verified,
                   reset_token, reset_token_expire, image, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, verified,
                   reset_token, reset_token_expire, image, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        id: Uuid,
        token: &str,
        not_expired_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, verified,
                   reset_token, reset_token_expire, image, created_at, updated_at
            FROM users
            WHERE id = $1 AND reset_token = $2 AND reset_token_expire >= $3
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(not_expired_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, verified: Option<bool>) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, verified,
                   reset_token, reset_token_expire, image, created_at, updated_at
            FROM users
            WHERE $1::boolean IS NULL OR verified = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(verified)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password_hash, role, verified,
                      reset_token, reset_token_expire, image, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(&new.image)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let touch_reset = changes.reset.is_some();
        let grant = changes.reset.flatten();
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                verified = COALESCE($5, verified),
                password_hash = COALESCE($6, password_hash),
                reset_token = CASE WHEN $7 THEN $8 ELSE reset_token END,
                reset_token_expire = CASE WHEN $7 THEN $9 ELSE reset_token_expire END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, verified,
                      reset_token, reset_token_expire, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.role)
        .bind(changes.verified)
        .bind(changes.password_hash)
        .bind(touch_reset)
        .bind(grant.as_ref().map(|g| g.token.clone()))
        .bind(grant.as_ref().map(|g| g.expires_at))
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $4,
                reset_token = NULL,
                reset_token_expire = NULL,
                updated_at = now()
            WHERE id = $1 AND reset_token = $2 AND reset_token_expire >= $3
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(now)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, verified,
                      reset_token, reset_token_expire, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
