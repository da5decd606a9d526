//! Conversation entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    /// Stored name. Direct conversations are displayed under the other
    /// member's name instead, see `ConversationService`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
    pub kind: ConversationKind,
    pub last_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_direct(&self) -> bool {
        self.kind == ConversationKind::Direct
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Direct => "direct",
            ConversationKind::Group => "group",
        }
    }
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preview of the message the conversation's last-message pointer targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessagePreview {
    pub message_id: i64,
    pub timestamp: DateTime<Utc>,
    pub content_kind: ContentKind,
    /// Message text; `None` for photo messages.
    pub text: Option<String>,
}

/// Outcome of comparing the stored pointer with the newest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerCheck {
    Consistent,
    Drifted {
        stored: Option<i64>,
        newest: Option<i64>,
    },
}
