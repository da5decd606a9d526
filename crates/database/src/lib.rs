//! Courier Database Crate
//!
//! Persistence for users, conversations, memberships, messages and comments:
//! connection management, migrations, the transactional unit of work and the
//! repositories that keep each conversation's last-message pointer in step
//! with its messages.

use anyhow::{Context, Result};
use courier_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod deletion;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;
pub mod unit_of_work;

pub use connection::prepare_database;
pub use deletion::{DeletionCoordinator, DeletionOutcome, PointerRepair};
pub use migrations::run_migrations;
pub use unit_of_work::UnitOfWork;

pub use repos::{
    CommentRepository, ConversationRepository, ConversationSnapshot, ConversationSummary,
    MemberRepository, MessageRepository, UserRepository,
};

pub use entities::{
    Comment, ContentKind, Conversation, ConversationKind, LastMessagePreview, Membership, Message,
    MessageContent, MessageKind, MessageStatus, NewMessage, PointerCheck, User,
};

pub use types::{ChatError, ChatResult, ErrorKind};

pub use courier_config::SortOrder;

/// Connect to the configured database and bring its schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = prepare_database(config).await?;

    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    Ok(pool)
}
