use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
    users::{
        dto::{CreateUserRequest, CreatedUserResponse, ListUsersQuery, UpdateUserRequest},
        repo_types::AdminUserView,
        services::AdminService,
    },
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/verify", patch(verify_user))
}

#[instrument(skip(svc, payload), fields(admin_id = %admin.0.id))]
pub async fn create_user(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), AppError> {
    let res = svc.create(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(svc), fields(admin_id = %admin.0.id))]
pub async fn list_users(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> Result<Json<Vec<AdminUserView>>, AppError> {
    Ok(Json(svc.list(query.verified).await?))
}

#[instrument(skip(svc), fields(admin_id = %admin.0.id))]
pub async fn get_user(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<AdminUserView>, AppError> {
    Ok(Json(svc.get(id).await?))
}

#[instrument(skip(svc, payload), fields(admin_id = %admin.0.id))]
pub async fn update_user(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<AdminUserView>, AppError> {
    Ok(Json(svc.update(id, payload).await?))
}

#[instrument(skip(svc), fields(admin_id = %admin.0.id))]
pub async fn delete_user(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<AdminUserView>, AppError> {
    Ok(Json(svc.delete(id).await?))
}

#[instrument(skip(svc), fields(admin_id = %admin.0.id))]
pub async fn verify_user(
    State(svc): State<AdminService>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<AdminUserView>, AppError> {
    Ok(Json(svc.verify(id).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        mail::testing::RecordingMailer,
        users::repo_types::{NewUser, Role, User},
    };

    use super::*;

    struct Harness {
        app: Router,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::fake(Arc::new(RecordingMailer::default()));
            Self {
                app: build_app(state.clone()),
                state,
            }
        }

        async fn seed(&self, email: &str, role: Role) -> (User, String) {
            let user = self
                .state
                .store
                .create(NewUser {
                    name: "Seeded".into(),
                    email: email.into(),
                    password_hash: None,
                    role,
                    image: None,
                })
                .await
                .unwrap();
            let token = self.state.jwt.sign_session(user.id, role).unwrap();
            (user, token)
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }
    }

    #[tokio::test]
    async fn non_admin_delete_is_forbidden_and_record_untouched() {
        let h = Harness::new();
        let (target, _) = h.seed("target@x.com", Role::User).await;
        let (_, user_token) = h.seed("plain@x.com", Role::User).await;

        let uri = format!("/users/{}", target.id);
        let (status, body) = h.send("DELETE", &uri, Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Forbidden resource");
        assert_eq!(body["path"], uri);

        assert!(h.state.store.find_by_id(target.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_routes_require_authentication() {
        let h = Harness::new();
        let (status, _) = h.send("GET", "/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_create_list_verify_delete() {
        let h = Harness::new();
        let (_, admin) = h.seed("admin@x.com", Role::Admin).await;

        let (status, created) = h
            .send(
                "POST",
                "/users",
                Some(&admin),
                Some(json!({"name": "Carol", "email": "carol@x.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["user"]["role"], "USER");
        let id = created["user"]["id"].as_str().unwrap().to_string();

        let (status, pending) = h
            .send("GET", "/users?verified=false", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let pending = pending.as_array().unwrap();
        assert!(pending.iter().any(|u| u["id"] == id.as_str()));
        assert!(pending.iter().all(|u| u.get("resetToken").is_none()));

        let (status, verified) = h
            .send("PATCH", &format!("/users/{id}/verify"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["verified"], true);

        let (status, fetched) = h.send("GET", &format!("/users/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["email"], "carol@x.com");
        assert!(fetched["createdAt"].is_string());

        let (status, _) = h
            .send("DELETE", &format!("/users/{id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = h.send("GET", &format!("/users/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let h = Harness::new();
        let (_, admin) = h.seed("admin@x.com", Role::Admin).await;
        let (status, _) = h.send("GET", "/users/not-a-uuid", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
