//! Message deletion with comment cleanup and pointer repair.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::repos::{comment_repository, pointer};
use crate::types::{ChatError, ChatResult};
use crate::unit_of_work::UnitOfWork;

/// What happened to the conversation's last-message pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerRepair {
    /// The deleted message was not the pointer target.
    Unchanged,
    /// The pointer now targets the newest remaining message.
    Repointed(i64),
    /// The conversation has no messages left.
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub message_id: i64,
    pub conversation_id: i64,
    pub comments_removed: u64,
    pub pointer: PointerRepair,
}

/// Removes a message, its comments and any pointer to it as one unit.
#[derive(Clone)]
pub struct DeletionCoordinator {
    pool: SqlitePool,
}

impl DeletionCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete `message_id`.
    ///
    /// Comments go first, then the message row. When the message was its
    /// conversation's last message the pointer is moved to the newest
    /// remaining message, or cleared. Any failure rolls the whole unit back.
    pub async fn delete_message(&self, message_id: i64) -> ChatResult<DeletionOutcome> {
        let mut uow = UnitOfWork::begin(&self.pool, "delete_message").await?;

        let comments_removed = comment_repository::delete_for_message(uow.conn(), message_id).await?;

        let row: Option<(i64,)> =
            sqlx::query_as("DELETE FROM messages WHERE id = ? RETURNING conversation_id")
                .bind(message_id)
                .fetch_optional(uow.conn())
                .await?;

        let Some((conversation_id,)) = row else {
            return Err(ChatError::message_not_found(message_id));
        };

        let repair = match pointer::owner_of(uow.conn(), message_id).await? {
            Some(owner) => {
                let newest = pointer::newest(uow.conn(), owner).await?;
                pointer::set(uow.conn(), owner, newest).await?;
                match newest {
                    Some(id) => PointerRepair::Repointed(id),
                    None => PointerRepair::Cleared,
                }
            }
            None => PointerRepair::Unchanged,
        };

        uow.commit().await?;

        info!(
            message_id,
            conversation_id,
            comments_removed,
            pointer = ?repair,
            "Message deleted"
        );

        Ok(DeletionOutcome {
            message_id,
            conversation_id,
            comments_removed,
            pointer: repair,
        })
    }
}
