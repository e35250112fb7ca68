// LikeService - Server-computed like toggling for posts and replies

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::{current_time_millis, millis_to_datetime, EntityId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, EntityIdGenerator};
use crate::models::{Like, LikeTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: u64,
}

#[derive(Clone)]
pub struct LikeService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<EntityIdGenerator>,
}

impl LikeService {
    pub fn new(db: Arc<dyn DatabaseInterface>, ids: Arc<EntityIdGenerator>) -> Self {
        Self { db, ids }
    }

    #[instrument(skip(self))]
    pub async fn toggle_like(&self, user: EntityId, target: LikeTarget) -> AppResult<LikeState> {
        self.ensure_target(target).await?;

        let liked = match self.db.find_like(user, target).await? {
            Some(existing) => {
                self.db.delete_like(existing.id).await?;
                false
            }
            None => {
                let like = Like {
                    id: self.ids.next_id(),
                    liked_by: user,
                    target,
                    created_at: millis_to_datetime(current_time_millis()),
                };
                match self.db.create_like(&like).await {
                    Ok(()) | Err(AppError::Conflict(_)) => true,
                    Err(err) => return Err(err),
                }
            }
        };

        let likes = self.db.count_likes(target).await?;
        debug!("User {} like on {:?} is now {}", user, target, liked);
        Ok(LikeState { liked, likes })
    }

    async fn ensure_target(&self, target: LikeTarget) -> AppResult<()> {
        let exists = match target {
            LikeTarget::Post(id) => self.db.get_post(id).await?.is_some(),
            LikeTarget::Reply(id) => self.db.get_reply(id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} not found", target.kind().as_str())))
        }
    }
}
