//! Projections returned by the services.

pub mod conversation_view;

pub use conversation_view::ConversationView;
