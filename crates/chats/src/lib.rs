//! # Courier Chats Crate
//!
//! Business logic on top of `courier-database`: membership and ownership
//! checks, read-status resolution and the message, conversation, comment and
//! user flows a transport layer calls into.
//!
//! ## Architecture
//!
//! - **Identity**: the [`IdentityDirectory`] contract services consult for
//!   user existence and membership
//! - **Services**: one service per aggregate, generic over the directory
//! - **Entities**: viewer-specific projections such as [`ConversationView`]
//! - **Utils**: input validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_chats::MessageService;
//!
//! let service = MessageService::new(pool);
//! let messages = service.list(conversation_id, user_id, None).await?;
//! ```

pub mod entities;
pub mod identity;
pub mod services;
pub mod utils;

pub use entities::ConversationView;
pub use identity::{IdentityDirectory, StoreDirectory};
pub use services::{
    CommentService, ConversationService, MessageService, StatusResolver, UserService,
};

pub use courier_database::{ChatError, ChatResult, ErrorKind};
