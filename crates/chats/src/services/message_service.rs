//! Message service for managing message operations.

use courier_config::SortOrder;
use courier_database::{
    ChatError, ChatResult, DeletionCoordinator, DeletionOutcome, MemberRepository, Message,
    MessageContent, MessageRepository, NewMessage,
};
use sqlx::SqlitePool;
use tracing::debug;

use super::{require_member, StatusResolver};
use crate::identity::{IdentityDirectory, StoreDirectory};

/// Service for sending, listing and deleting messages
#[derive(Clone)]
pub struct MessageService<D = StoreDirectory> {
    directory: D,
    messages: MessageRepository,
    members: MemberRepository,
    deletion: DeletionCoordinator,
    default_sort: SortOrder,
}

impl MessageService<StoreDirectory> {
    /// Create a message service backed by the store's own identity records
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_directory(pool.clone(), StoreDirectory::new(pool))
    }
}

impl<D> MessageService<D>
where
    D: IdentityDirectory,
{
    pub fn with_directory(pool: SqlitePool, directory: D) -> Self {
        Self {
            directory,
            messages: MessageRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            deletion: DeletionCoordinator::new(pool),
            default_sort: SortOrder::default(),
        }
    }

    /// Order used by [`MessageService::list`] when the caller passes none
    pub fn with_default_sort(mut self, order: SortOrder) -> Self {
        self.default_sort = order;
        self
    }

    /// Send a message to a conversation the sender belongs to
    pub async fn send(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: MessageContent,
    ) -> ChatResult<Message> {
        require_member(&self.directory, sender_id, conversation_id).await?;
        self.messages
            .create(&NewMessage::new(conversation_id, sender_id, content))
            .await
    }

    /// Reply to `target_id`.
    ///
    /// The target must exist but may live in any conversation; its content is
    /// not copied.
    pub async fn reply(
        &self,
        conversation_id: i64,
        sender_id: i64,
        target_id: i64,
        content: MessageContent,
    ) -> ChatResult<Message> {
        require_member(&self.directory, sender_id, conversation_id).await?;

        if self.messages.conversation_of(target_id).await?.is_none() {
            return Err(ChatError::message_not_found(target_id));
        }

        let new = NewMessage::new(conversation_id, sender_id, content).replying_to(target_id);
        self.messages.create(&new).await
    }

    /// Forward a message the sender can see into another of their conversations
    pub async fn forward(
        &self,
        sender_id: i64,
        source_conversation: i64,
        message_id: i64,
        target_conversation: i64,
    ) -> ChatResult<Message> {
        require_member(&self.directory, sender_id, source_conversation).await?;
        require_member(&self.directory, sender_id, target_conversation).await?;

        let source = self
            .messages
            .get_in_conversation(message_id, source_conversation)
            .await?;

        self.messages
            .forward(sender_id, &source, target_conversation)
            .await
    }

    /// Fetch one message of a conversation with its current status
    pub async fn get(
        &self,
        conversation_id: i64,
        viewer_id: i64,
        message_id: i64,
    ) -> ChatResult<Message> {
        require_member(&self.directory, viewer_id, conversation_id).await?;

        let mut message = self
            .messages
            .get_in_conversation(message_id, conversation_id)
            .await?;
        let watermarks = self.members.watermarks(conversation_id).await?;
        StatusResolver::apply(std::slice::from_mut(&mut message), &watermarks);

        Ok(message)
    }

    /// List a conversation's messages and mark them seen by `user_id`.
    ///
    /// Rows and watermarks are read first; the caller's watermark is advanced
    /// afterwards, so statuses in this response reflect the state before the
    /// listing.
    pub async fn list(
        &self,
        conversation_id: i64,
        user_id: i64,
        order: Option<SortOrder>,
    ) -> ChatResult<Vec<Message>> {
        require_member(&self.directory, user_id, conversation_id).await?;

        let order = order.unwrap_or(self.default_sort);
        let snapshot = self.messages.snapshot(conversation_id, order).await?;
        self.members.touch(user_id, conversation_id).await?;

        let mut messages = snapshot.messages;
        StatusResolver::apply(&mut messages, &snapshot.watermarks);

        debug!(
            conversation_id,
            user_id,
            count = messages.len(),
            order = %order,
            "Messages listed"
        );
        Ok(messages)
    }

    /// Delete a message. Only its sender may do so.
    pub async fn delete(
        &self,
        conversation_id: i64,
        requester_id: i64,
        message_id: i64,
    ) -> ChatResult<DeletionOutcome> {
        require_member(&self.directory, requester_id, conversation_id).await?;

        let message = self
            .messages
            .get_in_conversation(message_id, conversation_id)
            .await?;

        if message.sender.id != requester_id {
            return Err(ChatError::forbidden("only the sender can delete a message"));
        }

        self.deletion.delete_message(message.id).await
    }
}
