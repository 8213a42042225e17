use crate::dto::auth_dto::CreateSuperAdminPayload;
use crate::dto::user_dto::{CreateUserPayload, UpdateUserPayload};
use crate::error::{Error, Result};
use crate::models::user::{Role, User, USER_COLUMNS};
use crate::utils::crypto::hash_password;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

fn hash(plain: &str) -> Result<String> {
    hash_password(plain).map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

fn email_taken(err: Error) -> Error {
    match err {
        Error::Conflict(_) => Error::Conflict("User with this email already exists".into()),
        other => other,
    }
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn create(&self, payload: CreateUserPayload) -> Result<User> {
        if self.find_by_email(&payload.email).await?.is_some() {
            return Err(Error::Conflict("User with this email already exists".into()));
        }
        let password_hash = hash(&payload.password)?;
        let query = format!(
            "INSERT INTO users (email, name, password_hash, role, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(payload.email.trim().to_lowercase())
            .bind(payload.name.trim())
            .bind(password_hash)
            .bind(payload.role)
            .bind(payload.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| email_taken(e.into()))?;
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateUserPayload) -> Result<User> {
        self.get(id).await?;

        let password_hash = match payload.new_password() {
            Some(p) if p.chars().count() < 6 => {
                return Err(Error::BadRequest(
                    "Password must be at least 6 characters".into(),
                ))
            }
            Some(p) => Some(hash(p)?),
            None => None,
        };

        let query = format!(
            "UPDATE users
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 password_hash = COALESCE($4, password_hash),
                 role = COALESCE($5, role),
                 is_active = COALESCE($6, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(payload.name.as_deref().map(str::trim))
            .bind(payload.email.as_deref().map(|e| e.trim().to_lowercase()))
            .bind(password_hash)
            .bind(payload.role)
            .bind(payload.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| email_taken(e.into()))?;
        Ok(user)
    }

    /// Deletes the user. Foreign keys null out the user's references in CVs,
    /// versions, contracts and activity rows.
    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> Result<User> {
        if id == acting_user {
            return Err(Error::BadRequest("You cannot delete your own account".into()));
        }
        let query = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        Ok(user)
    }

    pub async fn mark_activated(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE users SET activated_at = COALESCE(activated_at, NOW()), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates the first ADMIN. The insert is conditional so two concurrent
    /// calls cannot both succeed.
    pub async fn create_super_admin(&self, payload: CreateSuperAdminPayload) -> Result<User> {
        let password_hash = hash(&payload.password)?;
        let name = payload
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Super Admin")
            .to_string();

        let query = format!(
            "INSERT INTO users (email, name, password_hash, role, is_active, activated_at)
             SELECT $1, $2, $3, $4, TRUE, NOW()
             WHERE NOT EXISTS (SELECT 1 FROM users WHERE role = $4)
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(payload.email.trim().to_lowercase())
            .bind(name)
            .bind(password_hash)
            .bind(Role::Admin)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| email_taken(e.into()))?
            .ok_or_else(|| Error::Conflict("An admin account already exists".into()))?;
        Ok(user)
    }
}
