//! Domain entities for the database layer

pub mod comment;
pub mod conversation;
pub mod member;
pub mod message;
pub mod user;

pub use comment::Comment;
pub use conversation::{Conversation, ConversationKind, LastMessagePreview, PointerCheck};
pub use member::Membership;
pub use message::{ContentKind, Message, MessageContent, MessageKind, MessageStatus, NewMessage};
pub use user::User;
