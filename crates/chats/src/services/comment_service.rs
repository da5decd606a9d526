//! Comment service: emoji reactions on messages.

use courier_database::{ChatError, ChatResult, Comment, CommentRepository, MessageRepository};
use sqlx::SqlitePool;

use super::require_member;
use crate::identity::{IdentityDirectory, StoreDirectory};
use crate::utils::Validator;

#[derive(Clone)]
pub struct CommentService<D = StoreDirectory> {
    directory: D,
    comments: CommentRepository,
    messages: MessageRepository,
}

impl CommentService<StoreDirectory> {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_directory(pool.clone(), StoreDirectory::new(pool))
    }
}

impl<D> CommentService<D>
where
    D: IdentityDirectory,
{
    pub fn with_directory(pool: SqlitePool, directory: D) -> Self {
        Self {
            directory,
            comments: CommentRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// React to a message of a conversation the sender belongs to
    pub async fn add(
        &self,
        conversation_id: i64,
        message_id: i64,
        sender_id: i64,
        emoji: &str,
    ) -> ChatResult<Comment> {
        Validator::emoji(emoji)?;
        require_member(&self.directory, sender_id, conversation_id).await?;
        self.require_message(conversation_id, message_id).await?;

        self.comments.add(message_id, sender_id, emoji).await
    }

    pub async fn get(&self, comment_id: i64) -> ChatResult<Comment> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| ChatError::comment_not_found(comment_id))
    }

    /// Delete a comment. Only the user who left it may remove it.
    pub async fn delete(
        &self,
        conversation_id: i64,
        message_id: i64,
        comment_id: i64,
        requester_id: i64,
    ) -> ChatResult<()> {
        require_member(&self.directory, requester_id, conversation_id).await?;
        self.require_message(conversation_id, message_id).await?;

        let comment = self.get(comment_id).await?;
        if comment.message_id != message_id {
            return Err(ChatError::comment_not_found(comment_id));
        }
        if comment.sender.id != requester_id {
            return Err(ChatError::forbidden("only the author can delete a comment"));
        }

        self.comments.delete(comment_id).await
    }

    /// Comments of one message, oldest first
    pub async fn list_for_message(
        &self,
        conversation_id: i64,
        message_id: i64,
        viewer_id: i64,
    ) -> ChatResult<Vec<Comment>> {
        require_member(&self.directory, viewer_id, conversation_id).await?;
        self.require_message(conversation_id, message_id).await?;

        self.comments.list_for_message(message_id).await
    }

    async fn require_message(&self, conversation_id: i64, message_id: i64) -> ChatResult<()> {
        match self.messages.conversation_of(message_id).await? {
            Some(owner) if owner == conversation_id => Ok(()),
            _ => Err(ChatError::message_not_found(message_id)),
        }
    }
}
