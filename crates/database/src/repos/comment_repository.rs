//! Comment (emoji reaction) storage.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::rows::{comment_from_row, COMMENT_COLUMNS};
use crate::entities::Comment;
use crate::types::{encode_timestamp, now_timestamp, ChatError, ChatResult};

/// SQLite caps the number of bound parameters per statement.
const BATCH_SIZE: usize = 500;

/// Repository for comment database operations
#[derive(Clone)]
pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, message_id: i64, sender_id: i64, content: &str) -> ChatResult<Comment> {
        let created_at = encode_timestamp(&now_timestamp());

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO comments (message_id, sender_id, content, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(message_id)
        .bind(sender_id)
        .bind(content)
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await?;

        info!(comment_id = id, message_id, sender_id, "Comment added");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ChatError::comment_not_found(id))
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             JOIN users u ON u.id = c.sender_id
             WHERE c.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(comment_from_row).transpose()
    }

    pub async fn delete(&self, id: i64) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::comment_not_found(id));
        }

        info!(comment_id = id, "Comment deleted");
        Ok(())
    }

    pub async fn list_for_message(&self, message_id: i64) -> ChatResult<Vec<Comment>> {
        let mut conn = self.pool.acquire().await?;
        list_for_messages(&mut conn, &[message_id]).await
    }
}

/// Comments of every message in `message_ids`, oldest first.
pub(crate) async fn list_for_messages(
    conn: &mut SqliteConnection,
    message_ids: &[i64],
) -> ChatResult<Vec<Comment>> {
    let mut comments = Vec::new();

    for chunk in message_ids.chunks(BATCH_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             JOIN users u ON u.id = c.sender_id
             WHERE c.message_id IN ({placeholders})
             ORDER BY c.id"
        );

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(*id);
        }

        for row in query.fetch_all(&mut *conn).await? {
            comments.push(comment_from_row(&row)?);
        }
    }

    Ok(comments)
}

/// Remove every comment of a message, returning how many were removed.
pub(crate) async fn delete_for_message(
    conn: &mut SqliteConnection,
    message_id: i64,
) -> ChatResult<u64> {
    let result = sqlx::query("DELETE FROM comments WHERE message_id = ?")
        .bind(message_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
