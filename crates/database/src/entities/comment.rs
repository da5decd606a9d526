//! Comment entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// An emoji reaction attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub message_id: i64,
    pub sender: User,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
