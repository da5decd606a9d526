//! Message entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, User};
use crate::types::{ChatError, ChatResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: User,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub content: MessageContent,
    pub reply_to_id: Option<i64>,
    /// Derived on every read, never stored.
    pub status: MessageStatus,
    pub comments: Vec<Comment>,
}

/// Input for inserting a standard or reply message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: MessageContent,
    pub reply_to_id: Option<i64>,
}

impl NewMessage {
    pub fn new(conversation_id: i64, sender_id: i64, content: MessageContent) -> Self {
        Self {
            conversation_id,
            sender_id,
            content,
            reply_to_id: None,
        }
    }

    pub fn replying_to(mut self, message_id: i64) -> Self {
        self.reply_to_id = Some(message_id);
        self
    }

    pub fn kind(&self) -> MessageKind {
        if self.reply_to_id.is_some() {
            MessageKind::Reply
        } else {
            MessageKind::Standard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Standard,
    Reply,
    Forward,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Standard => "standard",
            MessageKind::Reply => "reply",
            MessageKind::Forward => "forward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Photo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Photo => "photo",
        }
    }
}

/// Message body: exactly one of text or photo bytes, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    Photo(Vec<u8>),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> ChatResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::validation("message text must not be empty"));
        }
        Ok(Self::Text(text))
    }

    pub fn photo(bytes: impl Into<Vec<u8>>) -> ChatResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ChatError::validation("message photo must not be empty"));
        }
        Ok(Self::Photo(bytes))
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            MessageContent::Text(_) => ContentKind::Text,
            MessageContent::Photo(_) => ContentKind::Photo,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Photo(_) => None,
        }
    }

    pub fn as_photo(&self) -> Option<&[u8]> {
        match self {
            MessageContent::Text(_) => None,
            MessageContent::Photo(bytes) => Some(bytes),
        }
    }

    /// Rebuilds content from the nullable storage columns.
    pub(crate) fn from_columns(
        kind: ContentKind,
        text: Option<String>,
        photo: Option<Vec<u8>>,
    ) -> ChatResult<Self> {
        match (kind, text, photo) {
            (ContentKind::Text, Some(text), None) if !text.is_empty() => Ok(Self::Text(text)),
            (ContentKind::Photo, None, Some(bytes)) if !bytes.is_empty() => Ok(Self::Photo(bytes)),
            (kind, _, _) => Err(ChatError::corrupt(format!(
                "message columns do not match content kind `{}`",
                kind.as_str()
            ))),
        }
    }
}

/// Conversation-wide delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Received,
    Read,
}
