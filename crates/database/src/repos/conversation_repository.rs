//! Conversation storage and last-message pointer verification.

use courier_config::SortOrder;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::member_repository;
use super::pointer;
use super::rows::{conversation_from_row, preview_from_row, CONVERSATION_COLUMNS, PREVIEW_COLUMNS};
use crate::entities::{Conversation, ConversationKind, LastMessagePreview, PointerCheck};
use crate::types::{encode_timestamp, now_timestamp, ChatError, ChatResult};
use crate::unit_of_work::UnitOfWork;

/// A conversation together with the preview of its pointer target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub last_message: Option<LastMessagePreview>,
}

/// Repository for conversation database operations
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    pub async fn get(&self, id: i64) -> ChatResult<Conversation> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(id))
    }

    /// The direct conversation shared by two users, if one exists
    pub async fn find_direct_between(&self, a: i64, b: i64) -> ChatResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c
             JOIN memberships ma ON ma.conversation_id = c.id AND ma.user_id = ?
             JOIN memberships mb ON mb.conversation_id = c.id AND mb.user_id = ?
             WHERE c.kind = 'direct'
             ORDER BY c.id LIMIT 1"
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    /// Create a direct conversation holding exactly `a` and `b`.
    ///
    /// When a concurrent caller created the pair's conversation first, that
    /// conversation is returned instead.
    pub async fn create_direct(&self, a: i64, b: i64) -> ChatResult<Conversation> {
        if a == b {
            return Err(ChatError::invalid_state(
                "a direct conversation needs two distinct users",
            ));
        }

        // Pair key only; direct display names are resolved from the other member.
        let name = format!("direct:{}:{}", a.min(b), a.max(b));
        let mut uow = UnitOfWork::begin(&self.pool, "create_direct_conversation").await?;
        let conversation = match insert(&mut uow, &name, ConversationKind::Direct).await {
            Ok(conversation) => conversation,
            Err(e) if e.is_unique_violation() => {
                uow.rollback().await?;
                debug!(a, b, "Direct conversation already exists, reusing it");
                return self.find_direct_between(a, b).await?.ok_or_else(|| {
                    ChatError::invalid_state(format!(
                        "direct conversation key {name} is taken but has no matching members"
                    ))
                });
            }
            Err(e) => return Err(e),
        };
        member_repository::insert(uow.conn(), conversation.id, a).await?;
        member_repository::insert(uow.conn(), conversation.id, b).await?;
        uow.commit().await?;

        info!(conversation_id = conversation.id, a, b, "Direct conversation created");
        Ok(conversation)
    }

    /// Create a group conversation. Duplicate ids in `members` are ignored.
    pub async fn create_group(&self, name: &str, members: &[i64]) -> ChatResult<Conversation> {
        let mut unique = members.to_vec();
        unique.sort_unstable();
        unique.dedup();

        if unique.is_empty() {
            return Err(ChatError::invalid_state("a group needs at least one member"));
        }

        let mut uow = UnitOfWork::begin(&self.pool, "create_group_conversation").await?;
        let conversation = insert(&mut uow, name, ConversationKind::Group).await?;
        for user_id in &unique {
            member_repository::insert(uow.conn(), conversation.id, *user_id).await?;
        }
        uow.commit().await?;

        info!(
            conversation_id = conversation.id,
            name,
            members = unique.len(),
            "Group conversation created"
        );
        Ok(conversation)
    }

    /// Conversations of `user_id` with their last-message previews.
    ///
    /// Conversations are ordered by the timestamp of their last message;
    /// conversations without messages come last either way.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        order: SortOrder,
    ) -> ChatResult<Vec<ConversationSummary>> {
        let direction = order.as_sql();
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS}, {PREVIEW_COLUMNS}
             FROM conversations c
             JOIN memberships mb ON mb.conversation_id = c.id AND mb.user_id = ?
             LEFT JOIN messages m ON m.id = c.last_message_id AND m.conversation_id = c.id
             ORDER BY (m.created_at IS NULL), m.created_at {direction}, c.id {direction}"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ConversationSummary {
                    conversation: conversation_from_row(row)?,
                    last_message: preview_from_row(row)?,
                })
            })
            .collect()
    }

    /// Preview of the message the pointer targets, `None` while it is unset
    pub async fn last_message_preview(
        &self,
        conversation_id: i64,
    ) -> ChatResult<Option<LastMessagePreview>> {
        let row = sqlx::query(&format!(
            "SELECT {PREVIEW_COLUMNS} FROM conversations c
             LEFT JOIN messages m ON m.id = c.last_message_id AND m.conversation_id = c.id
             WHERE c.id = ?"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => preview_from_row(&row),
            None => Err(ChatError::conversation_not_found(conversation_id)),
        }
    }

    pub async fn rename(&self, conversation_id: i64, name: &str) -> ChatResult<()> {
        let result = sqlx::query("UPDATE conversations SET name = ? WHERE id = ?")
            .bind(name)
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::conversation_not_found(conversation_id));
        }

        info!(conversation_id, name, "Conversation renamed");
        Ok(())
    }

    pub async fn set_photo(&self, conversation_id: i64, photo: &[u8]) -> ChatResult<()> {
        let result = sqlx::query("UPDATE conversations SET photo = ? WHERE id = ?")
            .bind(photo)
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::conversation_not_found(conversation_id));
        }

        info!(conversation_id, bytes = photo.len(), "Conversation photo updated");
        Ok(())
    }

    /// Compare the stored pointer with the newest message.
    pub async fn verify_pointer(&self, conversation_id: i64) -> ChatResult<PointerCheck> {
        let mut uow = UnitOfWork::begin(&self.pool, "verify_pointer").await?;
        let check = check_pointer(&mut uow, conversation_id).await?;
        uow.rollback().await?;
        Ok(check)
    }

    /// Recompute the pointer and store it if it drifted.
    ///
    /// Returns what was found before the repair.
    pub async fn repair_pointer(&self, conversation_id: i64) -> ChatResult<PointerCheck> {
        let mut uow = UnitOfWork::begin(&self.pool, "repair_pointer").await?;
        let check = check_pointer(&mut uow, conversation_id).await?;

        if let PointerCheck::Drifted { stored, newest } = check {
            pointer::set(uow.conn(), conversation_id, newest).await?;
            warn!(conversation_id, ?stored, ?newest, "Repaired drifted last message pointer");
        }

        uow.commit().await?;
        Ok(check)
    }

    pub async fn all_ids(&self) -> ChatResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM conversations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

async fn insert(
    uow: &mut UnitOfWork,
    name: &str,
    kind: ConversationKind,
) -> ChatResult<Conversation> {
    let created_at = now_timestamp();

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO conversations (name, kind, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(kind)
    .bind(encode_timestamp(&created_at))
    .fetch_one(uow.conn())
    .await?;

    Ok(Conversation {
        id,
        name: name.to_string(),
        photo: None,
        kind,
        last_message_id: None,
        created_at,
    })
}

async fn check_pointer(uow: &mut UnitOfWork, conversation_id: i64) -> ChatResult<PointerCheck> {
    let stored = pointer::stored(uow.conn(), conversation_id).await?;
    let newest = pointer::newest(uow.conn(), conversation_id).await?;

    if stored == newest {
        Ok(PointerCheck::Consistent)
    } else {
        Ok(PointerCheck::Drifted { stored, newest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_direct, create_test_database, create_user, send_text};

    #[tokio::test]
    async fn direct_conversation_requires_two_users() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let repo = ConversationRepository::new(pool);

        let err = repo.create_direct(alice.id, alice.id).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn failed_creation_leaves_no_conversation() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let repo = ConversationRepository::new(pool);

        // user 404 does not exist, so the second membership insert fails
        assert!(repo.create_direct(alice.id, 404).await.is_err());
        assert!(repo.all_ids().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_direct_creation_returns_the_same_conversation() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool);

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            let (a, b) = if i % 2 == 0 { (alice.id, bob.id) } else { (bob.id, alice.id) };
            handles.push(tokio::spawn(async move { repo.create_direct(a, b).await }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(repo.all_ids().await.unwrap(), ids);
    }

    #[tokio::test]
    async fn second_direct_creation_reuses_the_pair() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let first = create_direct(&pool, alice.id, bob.id).await;
        let repo = ConversationRepository::new(pool);

        let again = repo.create_direct(bob.id, alice.id).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(repo.all_ids().await.unwrap(), vec![first.id]);
    }

    #[tokio::test]
    async fn finds_direct_conversation_in_either_order() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let conv = create_direct(&pool, alice.id, bob.id).await;
        let repo = ConversationRepository::new(pool);

        let found = repo.find_direct_between(bob.id, alice.id).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(conv.id));
    }

    #[tokio::test]
    async fn listing_orders_by_last_message_and_puts_empty_last() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let carol = create_user(&pool, "carol").await;
        let repo = ConversationRepository::new(pool.clone());

        let with_bob = create_direct(&pool, alice.id, bob.id).await;
        let with_carol = create_direct(&pool, alice.id, carol.id).await;
        let empty = repo
            .create_group("book club", &[alice.id, bob.id, carol.id])
            .await
            .unwrap();

        send_text(&pool, with_carol.id, carol.id, "first").await;
        let latest = send_text(&pool, with_bob.id, bob.id, "second").await;

        let newest_first = repo.list_for_user(alice.id, SortOrder::Desc).await.unwrap();
        let ids: Vec<i64> = newest_first.iter().map(|s| s.conversation.id).collect();
        assert_eq!(ids, vec![with_bob.id, with_carol.id, empty.id]);
        assert_eq!(
            newest_first[0].last_message.as_ref().map(|p| p.message_id),
            Some(latest.id)
        );
        assert!(newest_first[2].last_message.is_none());

        let oldest_first = repo.list_for_user(alice.id, SortOrder::Asc).await.unwrap();
        let ids: Vec<i64> = oldest_first.iter().map(|s| s.conversation.id).collect();
        assert_eq!(ids, vec![with_carol.id, with_bob.id, empty.id]);
    }

    #[tokio::test]
    async fn repair_restores_drifted_pointer() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let conv = create_direct(&pool, alice.id, bob.id).await;
        let first = send_text(&pool, conv.id, alice.id, "one").await;
        let second = send_text(&pool, conv.id, bob.id, "two").await;
        let repo = ConversationRepository::new(pool.clone());

        assert_eq!(repo.verify_pointer(conv.id).await.unwrap(), PointerCheck::Consistent);

        sqlx::query("UPDATE conversations SET last_message_id = ? WHERE id = ?")
            .bind(first.id)
            .bind(conv.id)
            .execute(&pool)
            .await
            .unwrap();

        let drifted = PointerCheck::Drifted {
            stored: Some(first.id),
            newest: Some(second.id),
        };
        assert_eq!(repo.verify_pointer(conv.id).await.unwrap(), drifted);
        assert_eq!(repo.repair_pointer(conv.id).await.unwrap(), drifted);
        assert_eq!(repo.get(conv.id).await.unwrap().last_message_id, Some(second.id));
    }

    #[tokio::test]
    async fn pointer_cannot_target_another_conversation() {
        let (pool, _dir) = create_test_database().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let carol = create_user(&pool, "carol").await;
        let one = create_direct(&pool, alice.id, bob.id).await;
        let other = create_direct(&pool, alice.id, carol.id).await;
        let foreign = send_text(&pool, other.id, carol.id, "elsewhere").await;

        let result = sqlx::query("UPDATE conversations SET last_message_id = ? WHERE id = ?")
            .bind(foreign.id)
            .bind(one.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
