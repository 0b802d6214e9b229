use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Roles carried over from the legacy system. The Portuguese spellings still
/// appear in imported data, so they are accepted as input aliases and
/// normalized here, at the serde boundary, rather than at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    #[serde(alias = "gestor")]
    Manager,
    #[serde(alias = "montador")]
    Fitter,
    #[serde(alias = "operacional")]
    Operational,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
}

/// What the API exposes about a user. Password hashes never leave the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub name: String,
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            name: user.name,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub role: UserRole,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_role_spellings_normalize() {
        let role: UserRole = serde_json::from_str("\"gestor\"").unwrap();
        assert_eq!(role, UserRole::Manager);
        let role: UserRole = serde_json::from_str("\"montador\"").unwrap();
        assert_eq!(role, UserRole::Fitter);
        let role: UserRole = serde_json::from_str("\"operacional\"").unwrap();
        assert_eq!(role, UserRole::Operational);
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"manager\"");
        assert_eq!(serde_json::to_string(&UserRole::Fitter).unwrap(), "\"fitter\"");
    }

    #[test]
    fn user_response_has_no_password() {
        let user = User {
            username: "ana".into(),
            password_hash: "$2b$12$secret".into(),
            name: "Ana".into(),
            role: UserRole::Fitter,
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret"));
    }
}
