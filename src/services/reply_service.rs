// ReplyService - Replies scoped to an existing post, same ownership rules as posts

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::{current_time_millis, millis_to_datetime, EntityId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, EntityIdGenerator, MediaStore};
use crate::models::Reply;
use crate::services::content::{
    ensure_media_limit, locators, media_items, plan_media_update, validate_content,
    validate_optional_content,
};
use crate::services::post_service::ContentUpdate;
use crate::services::{delete_all, upload_all, Outcome};

#[derive(Clone)]
pub struct ReplyService {
    db: Arc<dyn DatabaseInterface>,
    media: Arc<dyn MediaStore>,
    ids: Arc<EntityIdGenerator>,
}

impl ReplyService {
    pub fn new(db: Arc<dyn DatabaseInterface>, media: Arc<dyn MediaStore>, ids: Arc<EntityIdGenerator>) -> Self {
        Self { db, media, ids }
    }

    #[instrument(skip(self, content, files))]
    pub async fn create_reply(
        &self,
        owner: EntityId,
        post_id: EntityId,
        content: &str,
        files: &[PathBuf],
    ) -> AppResult<Reply> {
        let content = validate_content(content)?;
        ensure_media_limit(files.len())?;
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let uploaded = upload_all(self.media.as_ref(), files).await?;
        let now = millis_to_datetime(current_time_millis());
        let reply = Reply {
            id: self.ids.next_id(),
            post_id,
            owner_id: owner,
            content,
            media: media_items(uploaded),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.db.create_reply(&reply).await {
            delete_all(self.media.as_ref(), &locators(&reply.media)).await;
            return Err(err);
        }

        info!("User {} replied {} to post {}", owner, reply.id, post_id);
        Ok(reply)
    }

    #[instrument(skip(self, update, files))]
    pub async fn update_reply(
        &self,
        owner: EntityId,
        reply_id: EntityId,
        update: ContentUpdate,
        files: &[PathBuf],
    ) -> AppResult<Outcome<Reply>> {
        let mut reply = self.owned_reply(owner, reply_id).await?;
        let content = validate_optional_content(update.content.as_deref())?;
        let plan = plan_media_update(&reply.media, &update.remove_media, files)?;

        let added = media_items(upload_all(self.media.as_ref(), files).await?);

        if let Some(content) = content {
            reply.content = content;
        }
        reply.media = plan.kept.into_iter().chain(added.iter().cloned()).collect();
        reply.updated_at = millis_to_datetime(current_time_millis());

        if let Err(err) = self.db.update_reply(&reply).await {
            delete_all(self.media.as_ref(), &locators(&added)).await;
            return Err(err);
        }

        let warnings = delete_all(self.media.as_ref(), &plan.removed).await;
        Ok(Outcome::new(reply, warnings))
    }

    #[instrument(skip(self))]
    pub async fn delete_reply(&self, owner: EntityId, reply_id: EntityId) -> AppResult<Outcome<()>> {
        self.owned_reply(owner, reply_id).await?;

        let removal = self
            .db
            .delete_reply_cascade(reply_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reply not found".to_string()))?;

        let warnings = delete_all(self.media.as_ref(), &locators(&removal.media)).await;
        info!("User {} deleted reply {} ({} likes)", owner, reply_id, removal.likes_removed);
        Ok(Outcome::new((), warnings))
    }

    async fn owned_reply(&self, owner: EntityId, reply_id: EntityId) -> AppResult<Reply> {
        let reply = self
            .db
            .get_reply(reply_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reply not found".to_string()))?;
        if reply.owner_id != owner {
            return Err(AppError::Forbidden("You can only modify your own replies".to_string()));
        }
        Ok(reply)
    }
}
