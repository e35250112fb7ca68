// FeedService - Paginated post/reply views and user profiles

use std::sync::Arc;
use tracing::instrument;

use crate::core::EntityId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::DatabaseInterface;
use crate::models::{Page, PageRequest, PostView, ProfileView, ReplyView};
use crate::services::auth_service::normalize_identity;

#[derive(Clone)]
pub struct FeedService {
    db: Arc<dyn DatabaseInterface>,
}

impl FeedService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Newest first. The username must match exactly, ignoring case.
    #[instrument(skip(self))]
    pub async fn list_posts_by_user(
        &self,
        username: &str,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<Page<PostView>> {
        let page = page.normalized();
        let owner = self
            .db
            .find_user_by_username(&normalize_identity(username))
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid username".to_string()))?;

        let result = self.db.posts_by_owner(owner.id, viewer, page).await?;
        Ok(Page::from_query(result, page))
    }

    #[instrument(skip(self))]
    pub async fn list_replies(
        &self,
        post: EntityId,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<Page<ReplyView>> {
        let page = page.normalized();
        if self.db.get_post(post).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let result = self.db.replies_for_post(post, viewer, page).await?;
        Ok(Page::from_query(result, page))
    }

    #[instrument(skip(self))]
    pub async fn get_user_profile(&self, username: &str, viewer: Option<EntityId>) -> AppResult<ProfileView> {
        self.db
            .user_profile(&normalize_identity(username), viewer)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
