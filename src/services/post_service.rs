// PostService - Owner-scoped post creation, editing and cascading deletion

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::{current_time_millis, millis_to_datetime, EntityId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, EntityIdGenerator, MediaStore};
use crate::models::Post;
use crate::services::content::{
    ensure_media_limit, locators, media_items, plan_media_update, validate_content,
    validate_optional_content,
};
use crate::services::{delete_all, upload_all, Outcome};

/// Requested edits; blank content leaves the body untouched
#[derive(Debug, Clone, Default)]
pub struct ContentUpdate {
    pub content: Option<String>,
    pub remove_media: Vec<String>,
}

#[derive(Clone)]
pub struct PostService {
    db: Arc<dyn DatabaseInterface>,
    media: Arc<dyn MediaStore>,
    ids: Arc<EntityIdGenerator>,
}

impl PostService {
    pub fn new(db: Arc<dyn DatabaseInterface>, media: Arc<dyn MediaStore>, ids: Arc<EntityIdGenerator>) -> Self {
        Self { db, media, ids }
    }

    /// Media is uploaded before the post row exists; a failed upload creates nothing
    #[instrument(skip(self, content, files))]
    pub async fn create_post(&self, owner: EntityId, content: &str, files: &[PathBuf]) -> AppResult<Post> {
        let content = validate_content(content)?;
        ensure_media_limit(files.len())?;

        let uploaded = upload_all(self.media.as_ref(), files).await?;
        let now = millis_to_datetime(current_time_millis());
        let post = Post {
            id: self.ids.next_id(),
            owner_id: owner,
            content,
            media: media_items(uploaded),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.db.create_post(&post).await {
            delete_all(self.media.as_ref(), &locators(&post.media)).await;
            return Err(err);
        }

        info!("User {} created post {}", owner, post.id);
        Ok(post)
    }

    #[instrument(skip(self, update, files))]
    pub async fn update_post(
        &self,
        owner: EntityId,
        post_id: EntityId,
        update: ContentUpdate,
        files: &[PathBuf],
    ) -> AppResult<Outcome<Post>> {
        let mut post = self.owned_post(owner, post_id).await?;
        let content = validate_optional_content(update.content.as_deref())?;
        let plan = plan_media_update(&post.media, &update.remove_media, files)?;

        let uploaded = upload_all(self.media.as_ref(), files).await?;
        let added = media_items(uploaded);

        if let Some(content) = content {
            post.content = content;
        }
        post.media = plan.kept.into_iter().chain(added.iter().cloned()).collect();
        post.updated_at = millis_to_datetime(current_time_millis());

        if let Err(err) = self.db.update_post(&post).await {
            delete_all(self.media.as_ref(), &locators(&added)).await;
            return Err(err);
        }

        // Old blobs go only after the new state is durable
        let warnings = delete_all(self.media.as_ref(), &plan.removed).await;
        info!("User {} updated post {}", owner, post.id);
        Ok(Outcome::new(post, warnings))
    }

    /// Deletes the post, its replies and all their likes, then their media
    #[instrument(skip(self))]
    pub async fn delete_post(&self, owner: EntityId, post_id: EntityId) -> AppResult<Outcome<()>> {
        self.owned_post(owner, post_id).await?;

        let removal = self
            .db
            .delete_post_cascade(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let warnings = delete_all(self.media.as_ref(), &locators(&removal.media)).await;
        info!(
            "User {} deleted post {} ({} likes, {} replies)",
            owner, post_id, removal.likes_removed, removal.replies_removed
        );
        Ok(Outcome::new((), warnings))
    }

    async fn owned_post(&self, owner: EntityId, post_id: EntityId) -> AppResult<Post> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if post.owner_id != owner {
            return Err(AppError::Forbidden("You can only modify your own posts".to_string()));
        }
        Ok(post)
    }
}
