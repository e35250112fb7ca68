// Database Interface - Typed document accessors plus the read-side aggregations
// Services only ever see this trait; SqliteDatabase is the production implementation

use async_trait::async_trait;

use crate::core::EntityId;
use crate::error::AppResult;
use crate::models::{
    AccountChanges, CascadeRemoval, Follow, FollowView, Like, LikeTarget, NewUser, PageRequest,
    Post, PostView, ProfileView, QueryPage, Reply, ReplyView, User,
};

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    /// Create tables and indexes if they do not exist yet
    async fn initialize(&self) -> AppResult<()>;

    async fn health_check(&self) -> AppResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: EntityId) -> AppResult<Option<User>>;
    /// Exact match, ignoring case
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    /// First user whose username or email matches either value
    async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>>;
    async fn update_user_account(&self, id: EntityId, changes: &AccountChanges) -> AppResult<Option<User>>;
    async fn set_avatar(&self, id: EntityId, locator: &str) -> AppResult<()>;
    async fn set_cover_image(&self, id: EntityId, locator: &str) -> AppResult<()>;
    async fn set_password_hash(&self, id: EntityId, password_hash: &str) -> AppResult<()>;
    async fn set_refresh_token(&self, id: EntityId, token: Option<&str>) -> AppResult<()>;

    // Posts
    async fn create_post(&self, post: &Post) -> AppResult<()>;
    async fn get_post(&self, id: EntityId) -> AppResult<Option<Post>>;
    /// Persists content, media and updated_at
    async fn update_post(&self, post: &Post) -> AppResult<()>;
    /// Removes the post, its replies and every like on either, atomically.
    /// Returns `None` when the post does not exist.
    async fn delete_post_cascade(&self, id: EntityId) -> AppResult<Option<CascadeRemoval>>;

    // Replies
    async fn create_reply(&self, reply: &Reply) -> AppResult<()>;
    async fn get_reply(&self, id: EntityId) -> AppResult<Option<Reply>>;
    async fn update_reply(&self, reply: &Reply) -> AppResult<()>;
    async fn delete_reply_cascade(&self, id: EntityId) -> AppResult<Option<CascadeRemoval>>;

    // Likes
    async fn find_like(&self, liked_by: EntityId, target: LikeTarget) -> AppResult<Option<Like>>;
    async fn create_like(&self, like: &Like) -> AppResult<()>;
    async fn delete_like(&self, id: EntityId) -> AppResult<bool>;
    async fn count_likes(&self, target: LikeTarget) -> AppResult<u64>;

    // Follow edges
    async fn find_follow(&self, followed_by: EntityId, followed_to: EntityId) -> AppResult<Option<Follow>>;
    async fn create_follow(&self, follow: &Follow) -> AppResult<()>;
    async fn delete_follow(&self, id: EntityId) -> AppResult<bool>;

    // Aggregations
    async fn posts_by_owner(
        &self,
        owner: EntityId,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<QueryPage<PostView>>;
    async fn replies_for_post(
        &self,
        post: EntityId,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<QueryPage<ReplyView>>;
    /// Users following `user`, flagged with whether `viewer` follows each of them
    async fn followers_of(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<QueryPage<FollowView>>;
    /// Users `user` follows, flagged with whether `viewer` follows each of them
    async fn following_of(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<QueryPage<FollowView>>;
    async fn user_profile(&self, username: &str, viewer: Option<EntityId>) -> AppResult<Option<ProfileView>>;
}
