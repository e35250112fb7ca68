// UserService - Account field edits and avatar/cover replacement

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::EntityId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, MediaStore};
use crate::models::{AccountChanges, PublicUser};
use crate::services::auth_service::{normalize_identity, validate_email};
use crate::services::{delete_all, upload_all, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSlot {
    Avatar,
    Cover,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<dyn DatabaseInterface>,
    media: Arc<dyn MediaStore>,
}

impl UserService {
    pub fn new(db: Arc<dyn DatabaseInterface>, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    /// Blank values are treated as absent; at least one field must remain
    #[instrument(skip(self, changes))]
    pub async fn update_account(&self, user_id: EntityId, changes: AccountChanges) -> AppResult<PublicUser> {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let changes = AccountChanges {
            username: non_blank(changes.username).map(|v| normalize_identity(&v)),
            email: non_blank(changes.email).map(|v| normalize_identity(&v)),
            full_name: non_blank(changes.full_name).map(|v| v.trim().to_string()),
            bio: non_blank(changes.bio).map(|v| v.trim().to_string()),
            dob: changes.dob,
        };
        if changes.is_empty() {
            return Err(AppError::Validation("No data provided".to_string()));
        }
        if let Some(email) = &changes.email {
            validate_email(email)?;
        }

        if changes.username.is_some() || changes.email.is_some() {
            let clash = self
                .db
                .find_user_by_identity(changes.username.as_deref(), changes.email.as_deref())
                .await?;
            if clash.is_some_and(|other| other.id != user_id) {
                return Err(AppError::Conflict(
                    "User with email or username already exists".to_string(),
                ));
            }
        }

        let user = self
            .db
            .update_user_account(user_id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        info!("User {} updated account", user_id);
        Ok(PublicUser::from(&user))
    }

    pub async fn update_avatar(&self, user_id: EntityId, file: Option<&Path>) -> AppResult<Outcome<PublicUser>> {
        self.replace_image(user_id, file, ImageSlot::Avatar).await
    }

    pub async fn update_cover_image(&self, user_id: EntityId, file: Option<&Path>) -> AppResult<Outcome<PublicUser>> {
        self.replace_image(user_id, file, ImageSlot::Cover).await
    }

    /// Upload, persist, then delete the previous blob best-effort
    #[instrument(skip(self, file))]
    async fn replace_image(
        &self,
        user_id: EntityId,
        file: Option<&Path>,
        slot: ImageSlot,
    ) -> AppResult<Outcome<PublicUser>> {
        let Some(file) = file else {
            let field = match slot {
                ImageSlot::Avatar => "Avatar",
                ImageSlot::Cover => "Cover image",
            };
            return Err(AppError::Validation(format!("{} is required", field)));
        };

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let files: [PathBuf; 1] = [file.to_path_buf()];
        let uploaded = upload_all(self.media.as_ref(), &files).await?;
        let new_url = uploaded
            .into_iter()
            .next()
            .map(|asset| asset.url)
            .ok_or_else(|| AppError::Internal("Upload returned no asset".to_string()))?;

        let (persisted, previous) = match slot {
            ImageSlot::Avatar => (self.db.set_avatar(user_id, &new_url).await, Some(user.avatar)),
            ImageSlot::Cover => (self.db.set_cover_image(user_id, &new_url).await, user.cover_image),
        };
        if let Err(err) = persisted {
            delete_all(self.media.as_ref(), &[new_url]).await;
            return Err(err);
        }

        let stale: Vec<String> = previous.into_iter().filter(|url| !url.is_empty()).collect();
        let warnings = delete_all(self.media.as_ref(), &stale).await;

        let updated = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        info!("User {} replaced {:?}", user_id, slot);
        Ok(Outcome::new(PublicUser::from(&updated), warnings))
    }
}
