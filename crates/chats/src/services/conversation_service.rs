//! Conversation service: creation, viewer-specific display and membership.

use courier_config::SortOrder;
use courier_database::{
    ChatError, ChatResult, Conversation, ConversationRepository, LastMessagePreview,
    MemberRepository,
};
use sqlx::SqlitePool;
use tracing::info;

use super::{require_member, require_user};
use crate::entities::ConversationView;
use crate::identity::{IdentityDirectory, StoreDirectory};
use crate::utils::Validator;

/// Service for managing conversations and their members
#[derive(Clone)]
pub struct ConversationService<D = StoreDirectory> {
    directory: D,
    conversations: ConversationRepository,
    members: MemberRepository,
}

impl ConversationService<StoreDirectory> {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_directory(pool.clone(), StoreDirectory::new(pool))
    }
}

impl<D> ConversationService<D>
where
    D: IdentityDirectory,
{
    pub fn with_directory(pool: SqlitePool, directory: D) -> Self {
        Self {
            directory,
            conversations: ConversationRepository::new(pool.clone()),
            members: MemberRepository::new(pool),
        }
    }

    /// Open the direct conversation between two users, creating it if needed
    pub async fn start_direct(&self, user_id: i64, other_id: i64) -> ChatResult<ConversationView> {
        if user_id == other_id {
            return Err(ChatError::invalid_state(
                "cannot start a direct conversation with yourself",
            ));
        }
        require_user(&self.directory, user_id).await?;
        require_user(&self.directory, other_id).await?;

        let conversation = match self
            .conversations
            .find_direct_between(user_id, other_id)
            .await?
        {
            Some(existing) => existing,
            None => self.conversations.create_direct(user_id, other_id).await?,
        };

        self.view(conversation, user_id).await
    }

    /// Create a group; the creator is always a member
    pub async fn create_group(
        &self,
        creator_id: i64,
        name: &str,
        member_ids: &[i64],
    ) -> ChatResult<ConversationView> {
        Validator::group_name(name)?;

        let mut members = Vec::with_capacity(member_ids.len() + 1);
        members.push(creator_id);
        members.extend_from_slice(member_ids);

        for user_id in &members {
            require_user(&self.directory, *user_id).await?;
        }

        let conversation = self.conversations.create_group(name, &members).await?;
        self.view(conversation, creator_id).await
    }

    /// A conversation as `viewer_id` sees it
    pub async fn get(&self, conversation_id: i64, viewer_id: i64) -> ChatResult<ConversationView> {
        let conversation = self.conversations.get(conversation_id).await?;
        require_member(&self.directory, viewer_id, conversation_id).await?;
        self.view(conversation, viewer_id).await
    }

    /// Every conversation of `user_id`, ordered by last message
    pub async fn list(&self, user_id: i64, order: SortOrder) -> ChatResult<Vec<ConversationView>> {
        require_user(&self.directory, user_id).await?;

        let summaries = self.conversations.list_for_user(user_id, order).await?;
        let mut views = Vec::with_capacity(summaries.len());
        for summary in summaries {
            views.push(
                self.view_with_preview(summary.conversation, user_id, summary.last_message)
                    .await?,
            );
        }
        Ok(views)
    }

    pub async fn rename_group(
        &self,
        conversation_id: i64,
        requester_id: i64,
        name: &str,
    ) -> ChatResult<()> {
        Validator::group_name(name)?;
        self.require_group_member(conversation_id, requester_id).await?;
        self.conversations.rename(conversation_id, name).await
    }

    pub async fn set_group_photo(
        &self,
        conversation_id: i64,
        requester_id: i64,
        photo: &[u8],
    ) -> ChatResult<()> {
        Validator::photo(photo)?;
        self.require_group_member(conversation_id, requester_id).await?;
        self.conversations.set_photo(conversation_id, photo).await
    }

    /// Add `user_id` to a group the requester belongs to
    pub async fn add_member(
        &self,
        conversation_id: i64,
        requester_id: i64,
        user_id: i64,
    ) -> ChatResult<()> {
        self.require_group_member(conversation_id, requester_id).await?;
        require_user(&self.directory, user_id).await?;

        self.members.add(conversation_id, user_id).await?;
        info!(conversation_id, requester_id, user_id, "User added to group");
        Ok(())
    }

    /// Remove `user_id` from a group the requester belongs to
    pub async fn remove_member(
        &self,
        conversation_id: i64,
        requester_id: i64,
        user_id: i64,
    ) -> ChatResult<()> {
        self.require_group_member(conversation_id, requester_id).await?;
        self.members.remove(conversation_id, user_id).await
    }

    /// Leave a group. Fails with `NotFound` for non-members.
    pub async fn leave_group(&self, conversation_id: i64, user_id: i64) -> ChatResult<()> {
        let conversation = self.conversations.get(conversation_id).await?;
        if conversation.is_direct() {
            return Err(ChatError::invalid_state("cannot leave a direct conversation"));
        }

        self.members.remove(conversation_id, user_id).await?;
        info!(conversation_id, user_id, "User left group");
        Ok(())
    }

    /// Names of a conversation's members
    pub async fn member_names(
        &self,
        conversation_id: i64,
        requester_id: i64,
    ) -> ChatResult<Vec<String>> {
        self.conversations.get(conversation_id).await?;
        require_member(&self.directory, requester_id, conversation_id).await?;

        let users = self.members.member_users(conversation_id).await?;
        Ok(users.into_iter().map(|user| user.name).collect())
    }

    async fn require_group_member(&self, conversation_id: i64, requester_id: i64) -> ChatResult<()> {
        let conversation = self.conversations.get(conversation_id).await?;
        if conversation.is_direct() {
            return Err(ChatError::invalid_state(format!(
                "conversation {conversation_id} is not a group"
            )));
        }
        require_member(&self.directory, requester_id, conversation_id).await
    }

    async fn view(&self, conversation: Conversation, viewer_id: i64) -> ChatResult<ConversationView> {
        let preview = self
            .conversations
            .last_message_preview(conversation.id)
            .await?;
        self.view_with_preview(conversation, viewer_id, preview).await
    }

    async fn view_with_preview(
        &self,
        conversation: Conversation,
        viewer_id: i64,
        preview: Option<LastMessagePreview>,
    ) -> ChatResult<ConversationView> {
        if conversation.is_group() {
            return Ok(ConversationView::group(conversation, preview));
        }

        let other = self
            .directory
            .other_member_of(conversation.id, viewer_id)
            .await?;
        Ok(ConversationView::direct(
            &conversation,
            other.name,
            other.photo,
            preview,
        ))
    }
}
