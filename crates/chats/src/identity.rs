//! Identity and membership contract consumed by the services.

use courier_database::{ChatResult, MemberRepository, User, UserRepository};
use sqlx::SqlitePool;

/// Lookups the services need from the user and membership records.
pub trait IdentityDirectory {
    async fn user_exists(&self, user_id: i64) -> ChatResult<bool>;
    async fn is_member(&self, user_id: i64, conversation_id: i64) -> ChatResult<bool>;
    /// The member of a direct conversation that is not `user_id`.
    async fn other_member_of(&self, conversation_id: i64, user_id: i64) -> ChatResult<User>;
}

/// [`IdentityDirectory`] backed by the chat store itself.
#[derive(Clone)]
pub struct StoreDirectory {
    users: UserRepository,
    members: MemberRepository,
}

impl StoreDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            members: MemberRepository::new(pool),
        }
    }
}

impl IdentityDirectory for StoreDirectory {
    async fn user_exists(&self, user_id: i64) -> ChatResult<bool> {
        self.users.exists(user_id).await
    }

    async fn is_member(&self, user_id: i64, conversation_id: i64) -> ChatResult<bool> {
        self.members.is_member(user_id, conversation_id).await
    }

    async fn other_member_of(&self, conversation_id: i64, user_id: i64) -> ChatResult<User> {
        self.members.other_member(conversation_id, user_id).await
    }
}
