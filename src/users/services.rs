use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::JwtKeys,
    error::AppError,
    mail::{deliver, templates, Mailer},
    state::AppState,
    users::{
        dto::{CreateUserRequest, CreatedUser, CreatedUserResponse, UpdateUserRequest},
        repo::UserStore,
        repo_types::{AdminUserView, NewUser, UserChanges},
    },
    validate,
};

pub const USER_CREATED_MESSAGE: &str =
    "User created successfully and email has been sent to reset password";

const MIN_ADMIN_NAME_LEN: usize = 2;

/// Admin-only management of other users' records.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
    reset_password_url: String,
}

impl FromRef<AppState> for AdminService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.mailer.clone(),
            state.jwt.clone(),
            state.config.mail.reset_password_url.clone(),
        )
    }
}

fn not_found() -> AppError {
    AppError::NotFound("User not found")
}

impl AdminService {
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        keys: JwtKeys,
        reset_password_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            keys,
            reset_password_url,
        }
    }

    /// Creates an account without a password and mails its owner a reset link,
    /// which is the only way the account gets a usable credential.
    #[instrument(skip(self, req))]
    pub async fn create(&self, req: CreateUserRequest) -> Result<CreatedUserResponse, AppError> {
        let name = validate::name(&req.name, MIN_ADMIN_NAME_LEN)?;
        let email = validate::email(&req.email)?;

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "admin create for existing email");
            return Err(AppError::Conflict("User already exists".into()));
        }

        let user = self
            .store
            .create(NewUser {
                name,
                email,
                password_hash: None,
                role: req.role.unwrap_or_default(),
                image: None,
            })
            .await?;

        let token = self.keys.sign_password_reset(user.id)?;
        let expires_at = OffsetDateTime::now_utc() + self.keys.reset_ttl();
        self.store
            .update(user.id, UserChanges::grant_reset(token.clone(), expires_at))
            .await?
            .ok_or_else(not_found)?;
        info!(user_id = %user.id, role = ?user.role, "user created by admin");

        deliver(
            self.mailer.as_ref(),
            &user.email,
            templates::reset_password(&self.reset_password_url, &token),
        )
        .await;

        Ok(CreatedUserResponse {
            message: USER_CREATED_MESSAGE,
            user: CreatedUser {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, verified: Option<bool>) -> Result<Vec<AdminUserView>, AppError> {
        let users = self.store.list(verified).await?;
        Ok(users.into_iter().map(AdminUserView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<AdminUserView, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .map(AdminUserView::from)
            .ok_or_else(not_found)
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<AdminUserView, AppError> {
        let changes = UserChanges {
            name: req.name.as_deref().map(|n| validate::name(n, 1)).transpose()?,
            email: req.email.as_deref().map(validate::email).transpose()?,
            role: req.role,
            verified: req.verified,
            ..Default::default()
        };

        let user = self.store.update(id, changes).await?.ok_or_else(not_found)?;
        info!(user_id = %id, "user updated by admin");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<AdminUserView, AppError> {
        let user = self.store.delete(id).await?.ok_or_else(not_found)?;
        info!(user_id = %id, "user deleted by admin");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn verify(&self, id: Uuid) -> Result<AdminUserView, AppError> {
        let user = self
            .store
            .update(id, UserChanges::verify())
            .await?
            .ok_or_else(not_found)?;
        info!(user_id = %id, "user verified");
        Ok(user.into())
    }
}
