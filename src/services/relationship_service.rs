// RelationshipService - Follow toggling and follower/following pages

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::{current_time_millis, millis_to_datetime, EntityId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, EntityIdGenerator};
use crate::models::{Follow, FollowView, Page, PageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub is_following: bool,
}

#[derive(Clone)]
pub struct RelationshipService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<EntityIdGenerator>,
}

impl RelationshipService {
    pub fn new(db: Arc<dyn DatabaseInterface>, ids: Arc<EntityIdGenerator>) -> Self {
        Self { db, ids }
    }

    /// Flips the actor -> target edge based on what is stored, not on what the client believes
    #[instrument(skip(self))]
    pub async fn toggle_follow(&self, actor: EntityId, target: EntityId) -> AppResult<FollowState> {
        if actor == target {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }
        if self.db.get_user(target).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if let Some(edge) = self.db.find_follow(actor, target).await? {
            self.db.delete_follow(edge.id).await?;
            info!("User {} unfollowed {}", actor, target);
            return Ok(FollowState { is_following: false });
        }

        let edge = Follow {
            id: self.ids.next_id(),
            followed_by: actor,
            followed_to: target,
            created_at: millis_to_datetime(current_time_millis()),
        };
        match self.db.create_follow(&edge).await {
            Ok(()) => info!("User {} followed {}", actor, target),
            // A concurrent request created the same edge first
            Err(AppError::Conflict(_)) => {}
            Err(err) => return Err(err),
        }
        Ok(FollowState { is_following: true })
    }

    #[instrument(skip(self))]
    pub async fn list_followers(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<Page<FollowView>> {
        let page = page.normalized();
        self.ensure_user(user).await?;
        let result = self.db.followers_of(user, viewer, page).await?;
        Ok(Page::from_query(result, page))
    }

    #[instrument(skip(self))]
    pub async fn list_following(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<Page<FollowView>> {
        let page = page.normalized();
        self.ensure_user(user).await?;
        let result = self.db.following_of(user, viewer, page).await?;
        Ok(Page::from_query(result, page))
    }

    async fn ensure_user(&self, user: EntityId) -> AppResult<()> {
        match self.db.get_user(user).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }
}
