//! Membership entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (conversation, user) pair plus the user's read watermark.
///
/// `last_access` is `None` until the member lists the conversation for the
/// first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub conversation_id: i64,
    pub user_id: i64,
    pub last_access: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}
