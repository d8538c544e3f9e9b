//! Identity repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateUserRequest, Role, UpdateUserRequest, User, UserListQuery};

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, is_active, created_at, updated_at, last_login_at";

/// Repository for identity database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new identity repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new identity ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Create a new identity. `request.password` must already be hashed.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Self::generate_id();
        let role = request.role.unwrap_or_default();

        debug!("Creating user: {} ({})", request.email, id);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&request.password)
        .bind(&request.full_name)
        .bind(role.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get an identity by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        Ok(user)
    }

    /// Get an identity by email.
    #[instrument(skip(self, email))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        Ok(user)
    }

    /// List identities with optional filters.
    #[instrument(skip(self))]
    pub async fn list(&self, query: UserListQuery) -> Result<Vec<User>> {
        let limit = query.limit.unwrap_or(100);
        let offset = query.offset.unwrap_or(0);

        let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1");

        let mut bind_values: Vec<String> = Vec::new();

        if let Some(role) = &query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(role.to_string());
        }

        if let Some(is_active) = query.is_active {
            sql.push_str(" AND is_active = ?");
            bind_values.push(if is_active { "1" } else { "0" }.to_string());
        }

        if let Some(search) = &query.search {
            sql.push_str(" AND (email LIKE ? OR full_name LIKE ?)");
            let pattern = format!("%{}%", search);
            bind_values.push(pattern.clone());
            bind_values.push(pattern);
        }

        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query_builder = sqlx::query_as::<_, User>(&sql);

        for value in &bind_values {
            query_builder = query_builder.bind(value);
        }

        query_builder = query_builder.bind(limit).bind(offset);

        let users = query_builder
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        Ok(users)
    }

    /// Update an identity. `request.password` must already be hashed.
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))?;

        let mut updates = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(email) = &request.email {
            updates.push("email = ?");
            values.push(email.clone());
        }

        if let Some(password) = &request.password {
            updates.push("password_hash = ?");
            values.push(password.clone());
        }

        if let Some(full_name) = &request.full_name {
            updates.push("full_name = ?");
            values.push(full_name.clone());
        }

        if let Some(role) = &request.role {
            updates.push("role = ?");
            values.push(role.to_string());
        }

        if let Some(is_active) = request.is_active {
            updates.push("is_active = ?");
            values.push(if is_active { "1" } else { "0" }.to_string());
        }

        if updates.is_empty() {
            return Ok(existing);
        }

        updates.push("updated_at = datetime('now')");

        let sql = format!("UPDATE users SET {} WHERE id = ?", updates.join(", "));

        let mut query_builder = sqlx::query(&sql);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id);

        query_builder
            .execute(&self.pool)
            .await
            .context("Failed to update user")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    /// Delete an identity.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User not found: {}", id));
        }

        Ok(())
    }

    /// Update last login timestamp.
    #[instrument(skip(self))]
    pub async fn update_last_login(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update last login")?;

        Ok(())
    }

    /// Check if an email is available.
    #[instrument(skip(self, email))]
    pub async fn is_email_available(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email availability")?;

        Ok(count.0 == 0)
    }

    /// Count total identities.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(count.0)
    }

    /// Count identities by role.
    #[instrument(skip(self))]
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users by role")?;

        Ok(count.0)
    }

    /// Count active identities.
    #[instrument(skip(self))]
    pub async fn count_active(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count active users")?;

        Ok(count.0)
    }
}
