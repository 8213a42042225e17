use crate::error::{Error, Result};
use crate::middleware::auth::issue_token;
use crate::models::user::User;
use crate::services::user_service::UserService;
use crate::utils::crypto::verify_password;

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Invalid email or password".into())
}

impl AuthService {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }

    /// Checks the credentials and returns a signed token with the user.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(invalid_credentials)?;

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(invalid_credentials()),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "stored password hash is malformed");
                return Err(invalid_credentials());
            }
        }

        if !user.is_active {
            return Err(Error::Unauthorized("Account is disabled".into()));
        }

        let token = issue_token(&user)?;
        Ok((token, user))
    }
}
