use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::AppError, users::repo_types::Role};

/// Identity attached to the request once its bearer token checks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// An [`AuthUser`] whose role is ADMIN.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthenticated("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Invalid Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated("Invalid Authorization header"))?;
    Ok(token)
}

/// First stage: a valid session token must be present.
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers)?;
    let claims = keys.verify_session(token).map_err(|_| {
        warn!("invalid or expired bearer token");
        AppError::Unauthenticated("Invalid or expired token")
    })?;
    let role = claims
        .role
        .ok_or(AppError::Unauthenticated("Invalid or expired token"))?;
    Ok(AuthUser {
        id: claims.sub,
        role,
    })
}

/// Second stage: the authenticated identity must hold the ADMIN role.
pub fn require_admin(user: AuthUser) -> Result<AdminUser, AppError> {
    if user.role != Role::Admin {
        warn!(user_id = %user.id, "admin route denied");
        return Err(AppError::Forbidden);
    }
    Ok(AdminUser(user))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }
        let keys = JwtKeys::from_ref(state);
        let user = authenticate(&parts.headers, &keys)?;
        parts.extensions.insert(user);
        Ok(user)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_admin(user)
    }
}
