//! Row decoding shared by the repositories.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::entities::{
    Comment, Conversation, LastMessagePreview, Message, MessageContent, MessageStatus, User,
};
use crate::types::{decode_timestamp, ChatResult};

/// Message columns joined with the sender (`m` = messages, `u` = users).
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.created_at, m.kind, \
     m.content_kind, m.text, m.photo, m.reply_to_id, \
     u.id AS sender_id, u.name AS sender_name, u.photo AS sender_photo";

pub(crate) const COMMENT_COLUMNS: &str = "c.id, c.message_id, c.content, c.created_at, \
     u.id AS sender_id, u.name AS sender_name, u.photo AS sender_photo";

pub(crate) const CONVERSATION_COLUMNS: &str =
    "c.id, c.name, c.photo, c.kind, c.last_message_id, c.created_at";

/// Preview columns of the pointer target, aliased to avoid clashing with the
/// conversation's own columns.
pub(crate) const PREVIEW_COLUMNS: &str = "m.id AS preview_id, m.created_at AS preview_at, \
     m.content_kind AS preview_kind, m.text AS preview_text";

pub(crate) fn user_from_row(row: &SqliteRow) -> ChatResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        photo: row.try_get("photo")?,
    })
}

fn sender_from_row(row: &SqliteRow) -> ChatResult<User> {
    Ok(User {
        id: row.try_get("sender_id")?,
        name: row.try_get("sender_name")?,
        photo: row.try_get("sender_photo")?,
    })
}

pub(crate) fn message_from_row(row: &SqliteRow) -> ChatResult<Message> {
    let created_at: String = row.try_get("created_at")?;
    let content = MessageContent::from_columns(
        row.try_get("content_kind")?,
        row.try_get("text")?,
        row.try_get("photo")?,
    )?;

    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender: sender_from_row(row)?,
        timestamp: decode_timestamp(&created_at)?,
        kind: row.try_get("kind")?,
        content,
        reply_to_id: row.try_get("reply_to_id")?,
        status: MessageStatus::Received,
        comments: Vec::new(),
    })
}

pub(crate) fn comment_from_row(row: &SqliteRow) -> ChatResult<Comment> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Comment {
        id: row.try_get("id")?,
        message_id: row.try_get("message_id")?,
        sender: sender_from_row(row)?,
        content: row.try_get("content")?,
        created_at: decode_timestamp(&created_at)?,
    })
}

pub(crate) fn conversation_from_row(row: &SqliteRow) -> ChatResult<Conversation> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Conversation {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        photo: row.try_get("photo")?,
        kind: row.try_get("kind")?,
        last_message_id: row.try_get("last_message_id")?,
        created_at: decode_timestamp(&created_at)?,
    })
}

pub(crate) fn preview_from_row(row: &SqliteRow) -> ChatResult<Option<LastMessagePreview>> {
    let Some(message_id) = row.try_get::<Option<i64>, _>("preview_id")? else {
        return Ok(None);
    };
    let created_at: String = row.try_get("preview_at")?;

    Ok(Some(LastMessagePreview {
        message_id,
        timestamp: decode_timestamp(&created_at)?,
        content_kind: row.try_get("preview_kind")?,
        text: row.try_get("preview_text")?,
    }))
}
