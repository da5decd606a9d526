//! Last-message pointer maintenance.
//!
//! Every function here takes the connection of an open [`UnitOfWork`] so the
//! pointer moves in the same transaction as the message row it follows.
//!
//! [`UnitOfWork`]: crate::UnitOfWork

use sqlx::SqliteConnection;
use tracing::debug;

use crate::types::{ChatError, ChatResult};

/// Point `conversation_id` at `message_id`, or clear the pointer with `None`.
pub(crate) async fn set(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    message_id: Option<i64>,
) -> ChatResult<()> {
    let result = sqlx::query("UPDATE conversations SET last_message_id = ? WHERE id = ?")
        .bind(message_id)
        .bind(conversation_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ChatError::conversation_not_found(conversation_id));
    }

    debug!(conversation_id, ?message_id, "last message pointer moved");
    Ok(())
}

/// Conversation whose pointer currently targets `message_id`, if any.
pub(crate) async fn owner_of(
    conn: &mut SqliteConnection,
    message_id: i64,
) -> ChatResult<Option<i64>> {
    let owner: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM conversations WHERE last_message_id = ?")
            .bind(message_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(owner.map(|(id,)| id))
}

pub(crate) async fn stored(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> ChatResult<Option<i64>> {
    let row: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT last_message_id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some((pointer,)) => Ok(pointer),
        None => Err(ChatError::conversation_not_found(conversation_id)),
    }
}

/// Authoritative newest message of a conversation: maximum timestamp, ties
/// broken by the later insert.
pub(crate) async fn newest(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> ChatResult<Option<i64>> {
    let newest: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM messages WHERE conversation_id = ?
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(newest.map(|(id,)| id))
}
