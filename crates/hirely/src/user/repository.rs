//! User repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::User;
use super::validate::{NewAccount, ProfileChanges};
use crate::auth::Role;

const USER_COLUMNS: &str = "id, fullname, email, phone_number, password_hash, role, bio, skills, \
     avatar_url, created_at, updated_at, last_login_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Insert a user. `account.password` is ignored in favour of `password_hash`.
    #[instrument(skip(self, account, password_hash), fields(email = %account.email))]
    pub async fn create(&self, account: &NewAccount, password_hash: &str) -> Result<User> {
        let id = Self::generate_id();
        debug!("Creating user: {} ({})", account.email, id);

        sqlx::query(
            r#"
            INSERT INTO users (id, fullname, email, phone_number, password_hash, role, avatar_url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&account.fullname)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(password_hash)
        .bind(account.role)
        .bind(&account.avatar_url)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        Ok(user)
    }

    /// Get a user by (normalized) email.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")?;

        Ok(user)
    }

    /// Apply profile changes. Returns `None` if the user does not exist.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, id: &str, changes: &ProfileChanges) -> Result<Option<User>> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut updates = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(fullname) = &changes.fullname {
            updates.push("fullname = ?");
            values.push(fullname.clone());
        }

        if let Some(phone_number) = &changes.phone_number {
            updates.push("phone_number = ?");
            values.push(phone_number.clone());
        }

        if let Some(bio) = &changes.bio {
            updates.push("bio = ?");
            values.push(bio.clone());
        }

        if let Some(skills) = &changes.skills {
            updates.push("skills = ?");
            values.push(serde_json::to_string(skills).context("Failed to encode skills")?);
        }

        updates.push("updated_at = datetime('now')");

        let sql = format!("UPDATE users SET {} WHERE id = ?", updates.join(", "));

        let mut query_builder = sqlx::query(&sql);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id);

        let result = query_builder
            .execute(&self.pool)
            .await
            .context("Failed to update user")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
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
    #[instrument(skip(self))]
    pub async fn is_email_available(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email availability")?;

        Ok(count.0 == 0)
    }

    /// Count users by role.
    #[instrument(skip(self))]
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users by role")?;

        Ok(count.0)
    }
}

/// Whether an error chain bottoms out in a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
