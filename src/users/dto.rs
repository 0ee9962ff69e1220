use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::users::repo_types::Role;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Every field is optional; omitted fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Only `true` and `false` filter; any other value lists everyone.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub verified: Option<bool>,
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub message: &'static str,
    pub user: CreatedUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    fn verified_filter(uri: &str) -> Option<bool> {
        let uri: Uri = uri.parse().unwrap();
        Query::<ListUsersQuery>::try_from_uri(&uri).unwrap().0.verified
    }

    #[test]
    fn verified_filter_is_lenient() {
        assert_eq!(verified_filter("/users?verified=true"), Some(true));
        assert_eq!(verified_filter("/users?verified=false"), Some(false));
        assert_eq!(verified_filter("/users?verified=yes"), None);
        assert_eq!(verified_filter("/users?verified="), None);
        assert_eq!(verified_filter("/users"), None);
    }
}
