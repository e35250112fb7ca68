// Read-side view models assembled by the aggregation queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::EntityId;
use crate::models::MediaItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub owner: OwnerSummary,
    pub likes: u64,
    pub replies: u64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub post: EntityId,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub owner: OwnerSummary,
    pub likes: u64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a followers/following list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowView {
    pub user_id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    /// Whether the viewer follows this user
    pub is_following: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub dob: Option<NaiveDate>,
    pub followers: u64,
    pub following: u64,
    pub is_following: bool,
}
