//! User service for managing user operations.

use courier_database::{ChatError, ChatResult, User, UserRepository};
use sqlx::SqlitePool;
use tracing::info;

use crate::utils::Validator;

/// Service for managing user operations
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Session login: the user with this name, created on first use.
    ///
    /// The boolean is `true` when the user was created by this call.
    pub async fn login(&self, name: &str) -> ChatResult<(User, bool)> {
        Validator::user_name(name)?;

        let (user, created) = self.users.create_or_get(name).await?;
        info!(user_id = user.id, created, "User logged in");
        Ok((user, created))
    }

    pub async fn get(&self, user_id: i64) -> ChatResult<User> {
        self.users.get(user_id).await
    }

    pub async fn get_by_name(&self, name: &str) -> ChatResult<User> {
        self.users
            .find_by_name(name)
            .await?
            .ok_or_else(|| ChatError::user_not_found(name))
    }

    pub async fn rename(&self, user_id: i64, name: &str) -> ChatResult<User> {
        Validator::user_name(name)?;
        self.users.rename(user_id, name).await
    }

    pub async fn set_photo(&self, user_id: i64, photo: &[u8]) -> ChatResult<()> {
        Validator::photo(photo)?;
        self.users.set_photo(user_id, photo).await
    }
}
