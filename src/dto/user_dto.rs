use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_role() -> Role {
    Role::User
}

fn default_active() -> bool {
    true
}

/// Partial update. An empty password keeps the current hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserPayload {
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_to_active_user_role() {
        let payload: CreateUserPayload = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@agency.com","password":"secret1"}"#,
        )
        .unwrap();
        assert_eq!(payload.role, Role::User);
        assert!(payload.is_active);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let payload = CreateUserPayload {
            name: "Ana".into(),
            email: "ana@agency.com".into(),
            password: "12345".into(),
            role: Role::User,
            is_active: true,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn empty_password_keeps_hash() {
        let payload = UpdateUserPayload {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(payload.new_password().is_none());
    }
}
