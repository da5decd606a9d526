//! User repository for database operations.

use sqlx::SqlitePool;
use tracing::info;

use super::rows::user_from_row;
use crate::entities::User;
use crate::types::{encode_timestamp, now_timestamp, ChatError, ChatResult};

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, photo FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find user by ID, failing with `NotFound` when absent
    pub async fn get(&self, id: i64) -> ChatResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ChatError::user_not_found(id))
    }

    /// Find user by name
    pub async fn find_by_name(&self, name: &str) -> ChatResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, photo FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn exists(&self, id: i64) -> ChatResult<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Return the user called `name`, creating it first if needed.
    ///
    /// The boolean is `true` when this call created the user.
    pub async fn create_or_get(&self, name: &str) -> ChatResult<(User, bool)> {
        let now = encode_timestamp(&now_timestamp());

        let result = sqlx::query(
            "INSERT INTO users (name, created_at) VALUES (?, ?) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let user = self
            .find_by_name(name)
            .await?
            .ok_or_else(|| ChatError::user_not_found(name))?;

        if created {
            info!(user_id = user.id, name = %user.name, "User created");
        }

        Ok((user, created))
    }

    /// Rename a user. Names are unique, a taken name yields `Conflict`.
    pub async fn rename(&self, id: i64, name: &str) -> ChatResult<User> {
        let result = sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ChatError::from)
            .map_err(|e| {
                if e.is_unique_violation() {
                    ChatError::conflict(format!("user name `{name}` is already taken"))
                } else {
                    e
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(ChatError::user_not_found(id));
        }

        info!(user_id = id, name, "User renamed");
        self.get(id).await
    }

    pub async fn set_photo(&self, id: i64, photo: &[u8]) -> ChatResult<()> {
        let result = sqlx::query("UPDATE users SET photo = ? WHERE id = ?")
            .bind(photo)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::user_not_found(id));
        }

        info!(user_id = id, bytes = photo.len(), "User photo updated");
        Ok(())
    }
}
