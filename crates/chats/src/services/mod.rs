//! Business logic services for the chat system.
//!
//! Services apply membership and ownership rules over the identity directory
//! and delegate persistence to the `courier-database` repositories.

pub mod comment_service;
pub mod conversation_service;
pub mod message_service;
pub mod status_resolver;
pub mod user_service;

pub use comment_service::CommentService;
pub use conversation_service::ConversationService;
pub use message_service::MessageService;
pub use status_resolver::StatusResolver;
pub use user_service::UserService;

use courier_database::{ChatError, ChatResult};

use crate::identity::IdentityDirectory;

/// Fail with `Forbidden` unless `user_id` belongs to the conversation.
pub(crate) async fn require_member<D: IdentityDirectory>(
    directory: &D,
    user_id: i64,
    conversation_id: i64,
) -> ChatResult<()> {
    if directory.is_member(user_id, conversation_id).await? {
        Ok(())
    } else {
        Err(ChatError::forbidden(format!(
            "user {user_id} is not a member of conversation {conversation_id}"
        )))
    }
}

/// Fail with `NotFound` unless the user exists.
pub(crate) async fn require_user<D: IdentityDirectory>(directory: &D, user_id: i64) -> ChatResult<()> {
    if directory.user_exists(user_id).await? {
        Ok(())
    } else {
        Err(ChatError::user_not_found(user_id))
    }
}
