use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{NewUser, User, UserChanges};

/// Vec-backed store for tests, with the same email uniqueness rule as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(users: &[User], email: &str, except: Option<Uuid>) -> bool {
        users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn conflict() -> StoreError {
        StoreError::Conflict("Email is already in use".into())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_reset_token(
        &self,
        id: Uuid,
        token: &str,
        not_expired_at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| {
                u.id == id
                    && u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expire.is_some_and(|exp| exp >= not_expired_at)
            })
            .cloned())
    }

    async fn list(&self, verified: Option<bool>) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().unwrap();
        // later inserts first, so equal timestamps still come out newest first
        let mut rows: Vec<User> = users
            .iter()
            .rev()
            .filter(|u| verified.map_or(true, |v| u.verified == v))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if Self::email_taken(&users, &new.email, None) {
            return Err(Self::conflict());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            verified: false,
            reset_token: None,
            reset_token_expire: None,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = changes.email.as_deref() {
            if Self::email_taken(&users, email, Some(id)) {
                return Err(Self::conflict());
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(verified) = changes.verified {
            user.verified = verified;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(grant) = changes.reset {
            user.reset_token = grant.as_ref().map(|g| g.token.clone());
            user.reset_token_expire = grant.map(|g| g.expires_at);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| {
            u.id == id
                && u.reset_token.as_deref() == Some(token)
                && u.reset_token_expire.is_some_and(|exp| exp >= now)
        }) else {
            return Ok(false);
        };
        user.password_hash = Some(password_hash.to_string());
        user.reset_token = None;
        user.reset_token_expire = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let pos = users.iter().position(|u| u.id == id);
        Ok(pos.map(|i| users.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::{ResetGrant, Role};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: Some("hash".into()),
            role: Role::User,
            image: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_sets_and_clears_reset_grant_together() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com")).await.unwrap();
        let expires_at = OffsetDateTime::now_utc() + time::Duration::minutes(30);

        let updated = store
            .update(user.id, UserChanges::grant_reset("tok".into(), expires_at))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.reset_token.as_deref(), Some("tok"));
        assert_eq!(updated.reset_token_expire, Some(expires_at));

        let cleared = store
            .update(
                user.id,
                UserChanges {
                    reset: Some(None::<ResetGrant>),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.reset_token.is_none());
        assert!(cleared.reset_token_expire.is_none());
    }

    #[tokio::test]
    async fn find_by_reset_token_honours_expiry() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .update(user.id, UserChanges::grant_reset("tok".into(), now))
            .await
            .unwrap();

        let before = now - time::Duration::seconds(1);
        let after = now + time::Duration::seconds(1);
        assert!(store.find_by_reset_token(user.id, "tok", before).await.unwrap().is_some());
        assert!(store.find_by_reset_token(user.id, "tok", after).await.unwrap().is_none());
        assert!(store.find_by_reset_token(user.id, "other", before).await.unwrap().is_none());
    }
}
