use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            MessageResponse, RegisterRequest, ResetPasswordRequest,
        },
        extractors::AuthUser,
        services::AuthService,
    },
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
    users::repo_types::Profile,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", post(reset_password))
        .route("/auth/change-password", post(change_password))
}

#[instrument(skip(svc, payload))]
pub async fn register(
    State(svc): State<AuthService>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let res = svc.register(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(svc, payload))]
pub async fn login(
    State(svc): State<AuthService>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(svc.login(payload).await?))
}

#[instrument(skip(svc))]
pub async fn get_me(
    State(svc): State<AuthService>,
    user: AuthUser,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(svc.get_profile(user.id).await?))
}

#[instrument(skip(svc, payload))]
pub async fn forgot_password(
    State(svc): State<AuthService>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(svc.forgot_password(payload).await?))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(svc): State<AuthService>,
    AppPath(token): AppPath<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(svc.reset_password(&token, payload).await?))
}

#[instrument(skip(svc, payload))]
pub async fn change_password(
    State(svc): State<AuthService>,
    user: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(svc.change_password(user.id, payload).await?))
}
