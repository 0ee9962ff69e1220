use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
        },
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
    },
    error::AppError,
    mail::{deliver, templates, Mailer},
    state::AppState,
    users::{
        repo::UserStore,
        repo_types::{NewUser, Profile, Role, User, UserChanges},
    },
    validate,
};

pub const FORGOT_PASSWORD_MESSAGE: &str = "If email was valid, a reset link sent to your email";
pub const RESET_PASSWORD_MESSAGE: &str = "Password has been reset successfully";
pub const CHANGE_PASSWORD_MESSAGE: &str = "Password changed successfully";

/// Register, login and password lifecycle for self-service users.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
    reset_password_url: String,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.mailer.clone(),
            state.jwt.clone(),
            state.config.mail.reset_password_url.clone(),
        )
    }
}

impl AuthService {
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

    fn issue_session(&self, user: &User) -> Result<AuthResponse, AppError> {
        let access_token = self.keys.sign_session(user.id, user.role)?;
        Ok(AuthResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.keys.session_ttl().whole_seconds(),
            user: PublicUser {
                id: user.id,
                email: user.email.clone(),
                role: user.role,
            },
        })
    }

    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let name = validate::name(&req.name, 1)?;
        let email = validate::email(&req.email)?;
        validate::password(&req.password)?;

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email is already in use".into()));
        }

        let password_hash = hash_password_blocking(req.password).await?;
        // the unique constraint still catches a concurrent registration here
        let user = self
            .store
            .create(NewUser {
                name,
                email,
                password_hash: Some(password_hash),
                role: Role::User,
                image: req.image.filter(|i| !i.trim().is_empty()),
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "user registered");

        deliver(self.mailer.as_ref(), &user.email, templates::welcome(&user.name)).await;

        self.issue_session(&user)
    }

    /// Unknown email and wrong password both end in [`AppError::InvalidCredentials`].
    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = validate::email(&req.email)?;

        let Some(user) = self.store.find_by_email(&email).await? else {
            verify_dummy_blocking(req.password).await;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };
        let Some(hash) = user.password_hash.clone() else {
            verify_dummy_blocking(req.password).await;
            warn!(user_id = %user.id, "login for account without a password");
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password_blocking(req.password, hash).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.issue_session(&user)
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(Profile::from)
            .ok_or(AppError::NotFound("User not found"))
    }

    /// Answers the same way whether or not the email belongs to an account.
    #[instrument(skip(self, req))]
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        let email = validate::email(&req.email)?;

        match self.store.find_by_email(&email).await? {
            Some(user) => {
                let token = self.keys.sign_password_reset(user.id)?;
                let expires_at = OffsetDateTime::now_utc() + self.keys.reset_ttl();
                self.store
                    .update(user.id, UserChanges::grant_reset(token.clone(), expires_at))
                    .await?;
                info!(user_id = %user.id, expires_at = %expires_at, "password reset requested");

                deliver(
                    self.mailer.as_ref(),
                    &user.email,
                    templates::reset_password(&self.reset_password_url, &token),
                )
                .await;
            }
            None => debug!("password reset requested for unknown email"),
        }

        Ok(MessageResponse {
            message: FORGOT_PASSWORD_MESSAGE,
        })
    }

    /// Consumes a reset grant. The token must verify, be the one stored on the user and be
    /// unexpired there too; on success the grant is cleared so the token cannot be replayed.
    #[instrument(skip(self, token, req))]
    pub async fn reset_password(
        &self,
        token: &str,
        req: ResetPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        validate::password(&req.new_password)?;

        let claims = self
            .keys
            .verify_password_reset(token)
            .map_err(|_| AppError::InvalidToken)?;

        let now = OffsetDateTime::now_utc();
        if self
            .store
            .find_by_reset_token(claims.sub, token, now)
            .await?
            .is_none()
        {
            warn!(user_id = %claims.sub, "reset token not outstanding");
            return Err(AppError::InvalidToken);
        }

        let password_hash = hash_password_blocking(req.new_password).await?;
        if !self
            .store
            .complete_password_reset(claims.sub, token, now, &password_hash)
            .await?
        {
            warn!(user_id = %claims.sub, "reset token consumed concurrently");
            return Err(AppError::InvalidToken);
        }

        info!(user_id = %claims.sub, "password reset");
        Ok(MessageResponse {
            message: RESET_PASSWORD_MESSAGE,
        })
    }

    #[instrument(skip(self, req))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        validate::password(&req.new_password)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found"))?;
        let Some(hash) = user.password_hash else {
            return Err(AppError::IncorrectPassword);
        };
        if !verify_password_blocking(req.old_password, hash).await? {
            warn!(user_id = %user_id, "change password with wrong old password");
            return Err(AppError::IncorrectPassword);
        }

        let new_hash = hash_password_blocking(req.new_password).await?;
        self.store
            .update(user_id, UserChanges::password(new_hash))
            .await?
            .ok_or(AppError::NotFound("User not found"))?;

        info!(user_id = %user_id, "password changed");
        Ok(MessageResponse {
            message: CHANGE_PASSWORD_MESSAGE,
        })
    }
}
