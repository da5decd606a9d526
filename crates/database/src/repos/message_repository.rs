//! Repository for message data access operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use courier_config::SortOrder;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::rows::{message_from_row, user_from_row, MESSAGE_COLUMNS};
use super::{comment_repository, member_repository, pointer};
use crate::entities::{Message, MessageContent, MessageKind, MessageStatus, NewMessage, User};
use crate::types::{encode_timestamp, now_timestamp, ChatError, ChatResult};
use crate::unit_of_work::UnitOfWork;

/// Messages of a conversation and the member watermarks, read from one
/// consistent snapshot.
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub watermarks: Vec<Option<DateTime<Utc>>>,
}

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a standard or reply message and move the conversation's
    /// last-message pointer in the same transaction.
    pub async fn create(&self, new: &NewMessage) -> ChatResult<Message> {
        self.insert(
            new.conversation_id,
            new.sender_id,
            new.kind(),
            &new.content,
            new.reply_to_id,
        )
        .await
    }

    /// Copy `source` into `target_conversation` as a forward sent by `sender_id`.
    pub async fn forward(
        &self,
        sender_id: i64,
        source: &Message,
        target_conversation: i64,
    ) -> ChatResult<Message> {
        let message = self
            .insert(
                target_conversation,
                sender_id,
                MessageKind::Forward,
                &source.content,
                None,
            )
            .await?;

        info!(
            source_id = source.id,
            message_id = message.id,
            conversation_id = target_conversation,
            "Message forwarded"
        );
        Ok(message)
    }

    async fn insert(
        &self,
        conversation_id: i64,
        sender_id: i64,
        kind: MessageKind,
        content: &MessageContent,
        reply_to_id: Option<i64>,
    ) -> ChatResult<Message> {
        let sender = self.sender(sender_id).await?;
        self.ensure_conversation(conversation_id).await?;

        let timestamp = now_timestamp();
        let mut uow = UnitOfWork::begin(&self.pool, "insert_message").await?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO messages
                 (conversation_id, sender_id, created_at, kind, content_kind, text, photo, reply_to_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(encode_timestamp(&timestamp))
        .bind(kind)
        .bind(content.kind())
        .bind(content.as_text())
        .bind(content.as_photo())
        .bind(reply_to_id)
        .fetch_one(uow.conn())
        .await?;

        let newest = pointer::newest(uow.conn(), conversation_id).await?;
        pointer::set(uow.conn(), conversation_id, newest).await?;
        uow.commit().await?;

        info!(
            message_id = id,
            conversation_id,
            sender_id,
            kind = kind.as_str(),
            "Message created"
        );

        Ok(Message {
            id,
            conversation_id,
            sender,
            timestamp,
            kind,
            content: content.clone(),
            reply_to_id,
            status: MessageStatus::Received,
            comments: Vec::new(),
        })
    }

    /// Look a message up only within the given conversation
    pub async fn find_in_conversation(
        &self,
        message_id: i64,
        conversation_id: i64,
    ) -> ChatResult<Option<Message>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.id = ? AND m.conversation_id = ?"
        ))
        .bind(message_id)
        .bind(conversation_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut message = message_from_row(&row)?;
        message.comments = comment_repository::list_for_messages(&mut conn, &[message.id]).await?;
        Ok(Some(message))
    }

    pub async fn get_in_conversation(
        &self,
        message_id: i64,
        conversation_id: i64,
    ) -> ChatResult<Message> {
        self.find_in_conversation(message_id, conversation_id)
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))
    }

    /// Conversation a message belongs to
    pub async fn conversation_of(&self, message_id: i64) -> ChatResult<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT conversation_id FROM messages WHERE id = ?")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Messages of a conversation with senders and comments, status unset.
    pub async fn list_by_conversation(
        &self,
        conversation_id: i64,
        order: SortOrder,
    ) -> ChatResult<Vec<Message>> {
        let mut uow = UnitOfWork::begin(&self.pool, "list_messages").await?;
        let messages = load_messages(uow.conn(), conversation_id, order).await?;
        uow.rollback().await?;
        Ok(messages)
    }

    /// Messages plus member watermarks from a single read transaction.
    pub async fn snapshot(
        &self,
        conversation_id: i64,
        order: SortOrder,
    ) -> ChatResult<ConversationSnapshot> {
        let mut uow = UnitOfWork::begin(&self.pool, "conversation_snapshot").await?;
        let messages = load_messages(uow.conn(), conversation_id, order).await?;
        let watermarks = member_repository::watermarks(uow.conn(), conversation_id).await?;
        uow.rollback().await?;

        Ok(ConversationSnapshot {
            messages,
            watermarks,
        })
    }

    async fn sender(&self, sender_id: i64) -> ChatResult<User> {
        let row = sqlx::query("SELECT id, name, photo FROM users WHERE id = ?")
            .bind(sender_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(ChatError::user_not_found(sender_id)),
        }
    }

    async fn ensure_conversation(&self, conversation_id: i64) -> ChatResult<()> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?)")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(ChatError::conversation_not_found(conversation_id))
        }
    }
}

/// Load messages joined with their senders, then attach every comment with
/// one batched query instead of one query per message.
async fn load_messages(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    order: SortOrder,
) -> ChatResult<Vec<Message>> {
    let direction = order.as_sql();
    let rows = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.conversation_id = ?
         ORDER BY m.created_at {direction}, m.id {direction}"
    ))
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut messages = rows
        .iter()
        .map(message_from_row)
        .collect::<ChatResult<Vec<_>>>()?;

    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    let mut comments_by_message: HashMap<i64, Vec<_>> = HashMap::new();
    for comment in comment_repository::list_for_messages(conn, &ids).await? {
        comments_by_message
            .entry(comment.message_id)
            .or_default()
            .push(comment);
    }

    for message in &mut messages {
        if let Some(comments) = comments_by_message.remove(&message.id) {
            message.comments = comments;
        }
    }

    Ok(messages)
}
