//! User accounts
//!
//! User model and PostgreSQL-backed account service.

use crate::auth::Role;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::Serialize;
use uuid::Uuid;

/// User account record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    /// 12-digit Aadhaar number captured at registration; never serialized
    #[serde(skip_serializing)]
    pub aadhaar: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response (without sensitive data)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

fn role_from_str(s: &str) -> Result<Role, AppError> {
    match s {
        "citizen" => Ok(Role::Citizen),
        "official" => Ok(Role::Official),
        "admin" => Ok(Role::Admin),
        other => Err(AppError::Internal(format!("Unknown role in database: {}", other))),
    }
}

fn user_from_row(row: &tokio_postgres::Row) -> Result<User, AppError> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        aadhaar: row.get("aadhaar"),
        role: role_from_str(&role)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const USER_COLUMNS: &str = "id, email, password_hash, name, aadhaar, role, created_at, updated_at";

/// PostgreSQL-backed account service
pub struct UserService {
    pool: Pool,
}

impl UserService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new account. Email uniqueness is enforced by the database.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        aadhaar: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let client = self.pool.get().await?;
        let now = Utc::now();
        let id = Uuid::new_v4();

        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name, aadhaar, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[&id, &email, &password_hash, &name, &aadhaar, &role.to_string(), &now],
            )
            .await
            .map_err(|e| {
                if e.to_string().contains("unique") {
                    AppError::Conflict("Email already registered".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        user_from_row(&row)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&email]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn list(&self) -> Result<Vec<UserResponse>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let rows = client.query(sql.as_str(), &[]).await?;
        rows.iter()
            .map(|r| user_from_row(r).map(UserResponse::from))
            .collect()
    }

    /// Change a user's role (administrator action)
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<User, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&id, &role.to_string(), &Utc::now()])
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(role_from_str("citizen").unwrap(), Role::Citizen);
        assert_eq!(role_from_str("official").unwrap(), Role::Official);
        assert_eq!(role_from_str("admin").unwrap(), Role::Admin);
        assert!(role_from_str("viewer").is_err());
    }

    #[test]
    fn test_sensitive_fields_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "c@example.in".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            name: "Citizen".to_string(),
            aadhaar: "123456789012".to_string(),
            role: Role::Citizen,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("123456789012"));
    }
}
