// Entity documents - users, posts, replies, likes and follow edges

pub mod pagination;
pub mod views;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::EntityId;

pub use pagination::{Page, PageRequest, QueryPage};
pub use views::{FollowView, OwnerSummary, PostView, ProfileView, ReplyView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "mediaUrl")]
    pub media_url: String,
}

impl MediaItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self { media_url: url.into() }
    }
}

/// Stored user record, including credentials. Never serialized directly.
#[derive(Debug, Clone)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub bio: Option<String>,
    pub dob: Option<NaiveDate>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as returned to clients: password hash and refresh token stripped
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub bio: Option<String>,
    pub dob: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            bio: user.bio.clone(),
            dob: user.dob,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Partial account update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub dob: Option<NaiveDate>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.bio.is_none()
            && self.dob.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(rename = "owner")]
    pub owner_id: EntityId,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(rename = "post")]
    pub post_id: EntityId,
    #[serde(rename = "owner")]
    pub owner_id: EntityId,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discriminator stored next to `liked_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LikeKind {
    Post,
    Reply,
}

impl LikeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeKind::Post => "Post",
            LikeKind::Reply => "Reply",
        }
    }
}

/// Polymorphic like target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post(EntityId),
    Reply(EntityId),
}

impl LikeTarget {
    pub fn kind(&self) -> LikeKind {
        match self {
            LikeTarget::Post(_) => LikeKind::Post,
            LikeTarget::Reply(_) => LikeKind::Reply,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            LikeTarget::Post(id) | LikeTarget::Reply(id) => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Like {
    pub id: EntityId,
    pub liked_by: EntityId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub followed_by: EntityId,
    pub followed_to: EntityId,
    pub created_at: DateTime<Utc>,
}

/// Everything removed by a post/reply cascade delete
#[derive(Debug, Clone, Default)]
pub struct CascadeRemoval {
    pub media: Vec<MediaItem>,
    pub likes_removed: u64,
    pub replies_removed: u64,
}
