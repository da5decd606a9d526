//! Membership and read-watermark storage.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::rows::user_from_row;
use crate::entities::{Membership, User};
use crate::types::{decode_timestamp, encode_timestamp, now_timestamp, ChatError, ChatResult};
use crate::unit_of_work::UnitOfWork;

/// Repository for membership rows and the per-member `last_access` watermark
#[derive(Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add `user_id` to a conversation. The watermark starts unset.
    pub async fn add(&self, conversation_id: i64, user_id: i64) -> ChatResult<Membership> {
        let mut conn = self.pool.acquire().await?;
        let membership = insert(&mut conn, conversation_id, user_id)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ChatError::conflict(format!(
                        "user {user_id} is already a member of conversation {conversation_id}"
                    ))
                } else {
                    e
                }
            })?;

        info!(conversation_id, user_id, "Member added");
        Ok(membership)
    }

    /// Remove `user_id` from a conversation.
    ///
    /// The last remaining member cannot be removed.
    pub async fn remove(&self, conversation_id: i64, user_id: i64) -> ChatResult<()> {
        // Delete first so the unit holds the write lock before it counts.
        let mut uow = UnitOfWork::begin(&self.pool, "remove_member").await?;
        let result =
            sqlx::query("DELETE FROM memberships WHERE conversation_id = ? AND user_id = ?")
                .bind(conversation_id)
                .bind(user_id)
                .execute(uow.conn())
                .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::not_found(
                "Membership",
                format!("{conversation_id}/{user_id}"),
            ));
        }

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE conversation_id = ?")
                .bind(conversation_id)
                .fetch_one(uow.conn())
                .await?;
        if remaining == 0 {
            return Err(ChatError::invalid_state(format!(
                "user {user_id} is the last member of conversation {conversation_id}"
            )));
        }
        uow.commit().await?;

        info!(conversation_id, user_id, "Member removed");
        Ok(())
    }

    pub async fn is_member(&self, user_id: i64, conversation_id: i64) -> ChatResult<bool> {
        let (member,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE conversation_id = ? AND user_id = ?)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn find(&self, conversation_id: i64, user_id: i64) -> ChatResult<Option<Membership>> {
        let row = sqlx::query(
            "SELECT conversation_id, user_id, last_access, joined_at
             FROM memberships WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            membership_from_parts(
                row.try_get("conversation_id")?,
                row.try_get("user_id")?,
                row.try_get("last_access")?,
                row.try_get("joined_at")?,
            )
        })
        .transpose()
    }

    /// Users belonging to a conversation, ordered by name
    pub async fn member_users(&self, conversation_id: i64) -> ChatResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.photo FROM memberships mb
             JOIN users u ON u.id = mb.user_id
             WHERE mb.conversation_id = ? ORDER BY u.name",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// The member of a direct conversation that is not `user_id`
    pub async fn other_member(&self, conversation_id: i64, user_id: i64) -> ChatResult<User> {
        let row = sqlx::query(
            "SELECT u.id, u.name, u.photo FROM memberships mb
             JOIN users u ON u.id = mb.user_id
             WHERE mb.conversation_id = ? AND mb.user_id != ?
             ORDER BY u.id LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(ChatError::not_found(
                "Other member",
                format!("{conversation_id}/{user_id}"),
            )),
        }
    }

    /// Current watermark of every member, `None` for members who never listed
    pub async fn watermarks(&self, conversation_id: i64) -> ChatResult<Vec<Option<DateTime<Utc>>>> {
        let mut conn = self.pool.acquire().await?;
        watermarks(&mut conn, conversation_id).await
    }

    /// Advance the caller's watermark to now.
    ///
    /// The stored value never moves backwards. Fails with `InvalidState` when
    /// no membership row exists for the pair.
    pub async fn touch(&self, user_id: i64, conversation_id: i64) -> ChatResult<DateTime<Utc>> {
        let now = encode_timestamp(&now_timestamp());

        let row: Option<(String,)> = sqlx::query_as(
            "UPDATE memberships
             SET last_access = CASE
                 WHEN last_access IS NULL OR last_access < ?1 THEN ?1
                 ELSE last_access
             END
             WHERE conversation_id = ?2 AND user_id = ?3
             RETURNING last_access",
        )
        .bind(&now)
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((stored,)) = row else {
            return Err(ChatError::invalid_state(format!(
                "user {user_id} has no membership in conversation {conversation_id}"
            )));
        };

        debug!(conversation_id, user_id, last_access = %stored, "Watermark advanced");
        decode_timestamp(&stored)
    }
}

/// Insert a membership row on an open connection.
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    user_id: i64,
) -> ChatResult<Membership> {
    let joined_at = now_timestamp();

    sqlx::query("INSERT INTO memberships (conversation_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(conversation_id)
        .bind(user_id)
        .bind(encode_timestamp(&joined_at))
        .execute(&mut *conn)
        .await?;

    Ok(Membership {
        conversation_id,
        user_id,
        last_access: None,
        joined_at,
    })
}

pub(crate) async fn watermarks(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> ChatResult<Vec<Option<DateTime<Utc>>>> {
    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT last_access FROM memberships WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_all(&mut *conn)
            .await?;

    rows.into_iter()
        .map(|(last_access,)| last_access.as_deref().map(decode_timestamp).transpose())
        .collect()
}

fn membership_from_parts(
    conversation_id: i64,
    user_id: i64,
    last_access: Option<String>,
    joined_at: String,
) -> ChatResult<Membership> {
    Ok(Membership {
        conversation_id,
        user_id,
        last_access: last_access.as_deref().map(decode_timestamp).transpose()?,
        joined_at: decode_timestamp(&joined_at)?,
    })
}
