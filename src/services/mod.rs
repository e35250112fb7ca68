// Services - Business logic above the database interface and media store
// Each service is cheap to clone and shared through AppState

pub mod auth_service;
pub mod content;
pub mod feed_service;
pub mod like_service;
pub mod post_service;
pub mod relationship_service;
pub mod reply_service;
pub mod user_service;

use futures::future::join_all;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{MediaAsset, MediaStore};

pub use auth_service::{AuthService, Registration, Session};
pub use feed_service::FeedService;
pub use like_service::{LikeService, LikeState};
pub use post_service::PostService;
pub use relationship_service::{FollowState, RelationshipService};
pub use reply_service::ReplyService;
pub use user_service::UserService;

/// Result of a mutation whose media cleanup may have partially failed
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}

/// Uploads every file concurrently. On any failure the successful uploads are
/// deleted again and the first error is returned.
pub(crate) async fn upload_all(media: &dyn MediaStore, files: &[PathBuf]) -> AppResult<Vec<MediaAsset>> {
    let results = join_all(files.iter().map(|path| media.upload(path))).await;

    let mut uploaded = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(asset) => uploaded.push(asset),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => warn!("Additional upload failure: {}", err),
        }
    }

    match first_error {
        None => Ok(uploaded),
        Some(err) => {
            let locators: Vec<String> = uploaded.into_iter().map(|asset| asset.url).collect();
            delete_all(media, &locators).await;
            Err(AppError::Media(err))
        }
    }
}

/// Best-effort deletion; each failure is logged and returned as a warning
pub(crate) async fn delete_all(media: &dyn MediaStore, locators: &[String]) -> Vec<String> {
    let results = join_all(locators.iter().map(|locator| media.delete(locator))).await;

    locators
        .iter()
        .zip(results)
        .filter_map(|(locator, result)| {
            result.err().map(|err| {
                warn!("Failed to delete media {}: {}", locator, err);
                format!("Failed to delete media {}", locator)
            })
        })
        .collect()
}
