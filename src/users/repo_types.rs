use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// `None` for admin-created accounts until the first password reset.
    pub password_hash: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub reset_token: Option<String>,
    pub reset_token_expire: Option<OffsetDateTime>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields supplied when a user row is inserted. Role and verified come from the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub image: Option<String>,
}

/// An outstanding password-reset grant. The token and its expiry only travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetGrant {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
    pub password_hash: Option<String>,
    /// `Some(Some(_))` stores a grant, `Some(None)` clears it.
    pub reset: Option<Option<ResetGrant>>,
}

impl UserChanges {
    pub fn grant_reset(token: String, expires_at: OffsetDateTime) -> Self {
        Self {
            reset: Some(Some(ResetGrant { token, expires_at })),
            ..Default::default()
        }
    }

    pub fn password(password_hash: String) -> Self {
        Self {
            password_hash: Some(password_hash),
            ..Default::default()
        }
    }

    pub fn verify() -> Self {
        Self {
            verified: Some(true),
            ..Default::default()
        }
    }
}

/// Self-service projection, returned by `GET /auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub image: Option<String>,
}

impl From<User> for Profile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            image: u.image,
        }
    }
}

/// Projection used by the admin endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for AdminUserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            verified: u.verified,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
