//! A conversation as one particular member sees it.

use courier_database::{Conversation, ConversationKind, LastMessagePreview};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: i64,
    /// Group name, or the other member's name for direct conversations.
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
    pub kind: ConversationKind,
    pub last_message: Option<LastMessagePreview>,
}

impl ConversationView {
    /// View of a group, which displays its own name and photo.
    pub fn group(conversation: Conversation, last_message: Option<LastMessagePreview>) -> Self {
        Self {
            id: conversation.id,
            display_name: conversation.name,
            photo: conversation.photo,
            kind: conversation.kind,
            last_message,
        }
    }

    /// View of a direct conversation, displayed as the other member.
    pub fn direct(
        conversation: &Conversation,
        other_name: String,
        other_photo: Option<Vec<u8>>,
        last_message: Option<LastMessagePreview>,
    ) -> Self {
        Self {
            id: conversation.id,
            display_name: other_name,
            photo: other_photo,
            kind: conversation.kind,
            last_message,
        }
    }
}
