// Shared rules for post and reply bodies

use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::infrastructure::MediaAsset;
use crate::models::MediaItem;

pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MAX_MEDIA_ITEMS: usize = 5;

/// Trimmed content; rejects blank or oversized bodies
pub fn validate_content(content: &str) -> AppResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Content is required".to_string()));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "Content cannot exceed {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// `None` or blank means "leave unchanged"
pub fn validate_optional_content(content: Option<&str>) -> AppResult<Option<String>> {
    match content.map(str::trim) {
        Some(text) if !text.is_empty() => validate_content(text).map(Some),
        _ => Ok(None),
    }
}

pub fn ensure_media_limit(count: usize) -> AppResult<()> {
    if count > MAX_MEDIA_ITEMS {
        return Err(AppError::Validation(format!(
            "At most {} media files are allowed",
            MAX_MEDIA_ITEMS
        )));
    }
    Ok(())
}

/// How an update reshapes an entity's media list
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlan {
    pub kept: Vec<MediaItem>,
    /// Locators that belonged to the entity and were asked to be removed
    pub removed: Vec<String>,
}

/// Locators not attached to the entity are ignored so callers cannot delete foreign media
pub fn plan_media_update(existing: &[MediaItem], remove: &[String], new_files: &[PathBuf]) -> AppResult<MediaPlan> {
    let (removed, kept): (Vec<MediaItem>, Vec<MediaItem>) = existing
        .iter()
        .cloned()
        .partition(|item| remove.iter().any(|locator| locator == &item.media_url));

    ensure_media_limit(kept.len() + new_files.len())?;

    Ok(MediaPlan {
        kept,
        removed: removed.into_iter().map(|item| item.media_url).collect(),
    })
}

pub fn media_items(assets: Vec<MediaAsset>) -> Vec<MediaItem> {
    assets.into_iter().map(|asset| MediaItem::new(asset.url)).collect()
}

pub fn locators(media: &[MediaItem]) -> Vec<String> {
    media.iter().map(|item| item.media_url.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_validation() {
        assert_eq!(validate_content("  hello ").unwrap(), "hello");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_CHARS + 1)).is_err());
        assert_eq!(validate_optional_content(Some("  ")).unwrap(), None);
        assert_eq!(validate_optional_content(None).unwrap(), None);
    }

    #[test]
    fn test_plan_ignores_foreign_locators() {
        let existing = vec![MediaItem::new("http://m/a.png"), MediaItem::new("http://m/b.png")];
        let plan = plan_media_update(
            &existing,
            &["http://m/a.png".to_string(), "http://m/someone-else.png".to_string()],
            &[],
        )
        .unwrap();

        assert_eq!(plan.kept, vec![MediaItem::new("http://m/b.png")]);
        assert_eq!(plan.removed, vec!["http://m/a.png".to_string()]);
    }

    #[test]
    fn test_plan_enforces_limit_after_removal() {
        let existing: Vec<MediaItem> = (0..5).map(|i| MediaItem::new(format!("http://m/{}.png", i))).collect();
        let one_new = vec![PathBuf::from("/tmp/new.png")];

        assert!(plan_media_update(&existing, &[], &one_new).is_err());
        assert!(plan_media_update(&existing, &["http://m/0.png".to_string()], &one_new).is_ok());
    }
}
