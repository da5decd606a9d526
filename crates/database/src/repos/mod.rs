//! Database repository implementations

pub mod comment_repository;
pub mod conversation_repository;
pub mod member_repository;
pub mod message_repository;
pub(crate) mod pointer;
pub(crate) mod rows;
pub mod user_repository;

pub use comment_repository::CommentRepository;
pub use conversation_repository::{ConversationRepository, ConversationSummary};
pub use member_repository::MemberRepository;
pub use message_repository::{ConversationSnapshot, MessageRepository};
pub use user_repository::UserRepository;
