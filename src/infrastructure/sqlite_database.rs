// SQLite Database - sqlx-backed implementation of DatabaseInterface
// Counts and viewer flags are correlated subqueries evaluated at read time

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

use crate::core::{current_time_millis, millis_to_datetime, EntityId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::DatabaseInterface;
use crate::models::{
    AccountChanges, CascadeRemoval, Follow, FollowView, Like, LikeKind, LikeTarget, MediaItem,
    NewUser, OwnerSummary, PageRequest, Post, PostView, ProfileView, QueryPage, Reply, ReplyView,
    User,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL COLLATE NOCASE,
        email TEXT NOT NULL COLLATE NOCASE,
        full_name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        avatar TEXT NOT NULL,
        cover_image TEXT,
        bio TEXT,
        dob TEXT,
        refresh_token TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users(username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)",
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY,
        owner_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        media TEXT NOT NULL DEFAULT '[]',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_owner ON posts(owner_id, created_at DESC, id DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS replies (
        id INTEGER PRIMARY KEY,
        post_id INTEGER NOT NULL,
        owner_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        media TEXT NOT NULL DEFAULT '[]',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_replies_post ON replies(post_id, created_at DESC, id DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS likes (
        id INTEGER PRIMARY KEY,
        liked_by INTEGER NOT NULL,
        liked_item INTEGER NOT NULL,
        item_kind TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_unique ON likes(liked_by, liked_item, item_kind)",
    "CREATE INDEX IF NOT EXISTS idx_likes_item ON likes(liked_item, item_kind)",
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        id INTEGER PRIMARY KEY,
        followed_by INTEGER NOT NULL,
        followed_to INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_follows_unique ON follows(followed_by, followed_to)",
    "CREATE INDEX IF NOT EXISTS idx_follows_to ON follows(followed_to, created_at DESC, id DESC)",
];

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar, cover_image, \
     bio, dob, refresh_token, created_at, updated_at";

/// Maps a sqlx failure to AppError, classifying unique violations as conflicts
fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Failed to {}: record already exists", action))
        }
        _ => AppError::DatabaseError(format!("Failed to {}: {}", action, e)),
    }
}

fn encode_media(media: &[MediaItem]) -> AppResult<String> {
    serde_json::to_string(media)
        .map_err(|e| AppError::Internal(format!("Failed to encode media list: {}", e)))
}

fn decode_media(row: &SqliteRow, column: &str) -> Result<Vec<MediaItem>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn count(row: &SqliteRow, column: &str) -> Result<u64, sqlx::Error> {
    Ok(row.try_get::<i64, _>(column)?.max(0) as u64)
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool, sqlx::Error> {
    Ok(row.try_get::<i64, _>(column)? != 0)
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        password_hash: row.try_get("password_hash")?,
        avatar: row.try_get("avatar")?,
        cover_image: row.try_get("cover_image")?,
        bio: row.try_get("bio")?,
        dob: row.try_get("dob")?,
        refresh_token: row.try_get("refresh_token")?,
        created_at: millis_to_datetime(row.try_get("created_at")?),
        updated_at: millis_to_datetime(row.try_get("updated_at")?),
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        content: row.try_get("content")?,
        media: decode_media(row, "media")?,
        created_at: millis_to_datetime(row.try_get("created_at")?),
        updated_at: millis_to_datetime(row.try_get("updated_at")?),
    })
}

fn reply_from_row(row: &SqliteRow) -> Result<Reply, sqlx::Error> {
    Ok(Reply {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        owner_id: row.try_get("owner_id")?,
        content: row.try_get("content")?,
        media: decode_media(row, "media")?,
        created_at: millis_to_datetime(row.try_get("created_at")?),
        updated_at: millis_to_datetime(row.try_get("updated_at")?),
    })
}

fn owner_from_row(row: &SqliteRow) -> Result<OwnerSummary, sqlx::Error> {
    Ok(OwnerSummary {
        id: row.try_get("owner_id")?,
        username: row.try_get("owner_username")?,
        full_name: row.try_get("owner_full_name")?,
        avatar: row.try_get("owner_avatar")?,
    })
}

fn follow_view_from_row(row: &SqliteRow) -> Result<FollowView, sqlx::Error> {
    Ok(FollowView {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        avatar: row.try_get("avatar")?,
        is_following: flag(row, "is_following")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<ProfileView, sqlx::Error> {
    Ok(ProfileView {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        bio: row.try_get("bio")?,
        avatar: row.try_get("avatar")?,
        cover_image: row.try_get("cover_image")?,
        dob: row.try_get("dob")?,
        followers: count(row, "follower_count")?,
        following: count(row, "following_count")?,
        is_following: flag(row, "is_following")?,
    })
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file named by `url`
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        if url.contains(":memory:") {
            return Self::new_in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid DATABASE_URL '{}': {}", url, e)))?
            .create_if_missing(true);
        ensure_parent_dir(url)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(db_error("connect to database"))?;

        info!("Connected to {}", url);
        Ok(Self::new(pool))
    }

    /// Single pinned connection: an in-memory database lives only as long as its connection
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error("open in-memory database"))?;
        Ok(Self::new(pool))
    }

    async fn fetch_user(&self, sql: &str, binds: &[&str]) -> AppResult<Option<User>> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load user"))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(db_error("decode user"))
    }

    async fn set_user_column(&self, id: EntityId, column: &'static str, value: Option<&str>) -> AppResult<()> {
        let sql = format!("UPDATE users SET {} = ?, updated_at = ? WHERE id = ?", column);
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(current_time_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("update user"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}

fn ensure_parent_dir(url: &str) -> AppResult<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::ConfigurationError(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("initialize schema"))?;
        }
        info!("Database schema ready");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("run health check"))?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let now = current_time_millis();
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, avatar, cover_image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("create user"))?;

        Ok(User {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            avatar: user.avatar,
            cover_image: user.cover_image,
            bio: None,
            dob: None,
            refresh_token: None,
            created_at: millis_to_datetime(now),
            updated_at: millis_to_datetime(now),
        })
    }

    async fn get_user(&self, id: EntityId) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load user"))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(db_error("decode user"))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.fetch_user(
            &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
            &[username.trim()],
        )
        .await
    }

    async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>> {
        match (username, email) {
            (Some(username), Some(email)) => {
                self.fetch_user(
                    &format!("SELECT {} FROM users WHERE username = ? OR email = ? LIMIT 1", USER_COLUMNS),
                    &[username, email],
                )
                .await
            }
            (Some(username), None) => self.find_user_by_username(username).await,
            (None, Some(email)) => {
                self.fetch_user(
                    &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                    &[email],
                )
                .await
            }
            (None, None) => Ok(None),
        }
    }

    async fn update_user_account(&self, id: EntityId, changes: &AccountChanges) -> AppResult<Option<User>> {
        let result = sqlx::query(
            "UPDATE users SET \
                username = COALESCE(?, username), \
                email = COALESCE(?, email), \
                full_name = COALESCE(?, full_name), \
                bio = COALESCE(?, bio), \
                dob = COALESCE(?, dob), \
                updated_at = ? \
             WHERE id = ?",
        )
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.full_name)
        .bind(&changes.bio)
        .bind(changes.dob)
        .bind(current_time_millis())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error("update account"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    async fn set_avatar(&self, id: EntityId, locator: &str) -> AppResult<()> {
        self.set_user_column(id, "avatar", Some(locator)).await
    }

    async fn set_cover_image(&self, id: EntityId, locator: &str) -> AppResult<()> {
        self.set_user_column(id, "cover_image", Some(locator)).await
    }

    async fn set_password_hash(&self, id: EntityId, password_hash: &str) -> AppResult<()> {
        self.set_user_column(id, "password_hash", Some(password_hash)).await
    }

    async fn set_refresh_token(&self, id: EntityId, token: Option<&str>) -> AppResult<()> {
        self.set_user_column(id, "refresh_token", token).await
    }

    async fn create_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, owner_id, content, media, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(post.id)
        .bind(post.owner_id)
        .bind(&post.content)
        .bind(encode_media(&post.media)?)
        .bind(post.created_at.timestamp_millis())
        .bind(post.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error("create post"))?;
        Ok(())
    }

    async fn get_post(&self, id: EntityId) -> AppResult<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, owner_id, content, media, created_at, updated_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load post"))?;
        row.as_ref()
            .map(post_from_row)
            .transpose()
            .map_err(db_error("decode post"))
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        let result = sqlx::query("UPDATE posts SET content = ?, media = ?, updated_at = ? WHERE id = ?")
            .bind(&post.content)
            .bind(encode_media(&post.media)?)
            .bind(post.updated_at.timestamp_millis())
            .bind(post.id)
            .execute(&self.pool)
            .await
            .map_err(db_error("update post"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        Ok(())
    }

    async fn delete_post_cascade(&self, id: EntityId) -> AppResult<Option<CascadeRemoval>> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let Some(row) = sqlx::query("SELECT media FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("load post"))?
        else {
            return Ok(None);
        };
        let mut media = decode_media(&row, "media").map_err(db_error("decode post"))?;

        let reply_rows = sqlx::query("SELECT media FROM replies WHERE post_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("load replies"))?;
        for reply_row in &reply_rows {
            media.extend(decode_media(reply_row, "media").map_err(db_error("decode reply"))?);
        }

        let reply_likes = sqlx::query(
            "DELETE FROM likes WHERE item_kind = ? AND liked_item IN (SELECT id FROM replies WHERE post_id = ?)",
        )
        .bind(LikeKind::Reply.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("delete reply likes"))?;

        let post_likes = sqlx::query("DELETE FROM likes WHERE item_kind = ? AND liked_item = ?")
            .bind(LikeKind::Post.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete post likes"))?;

        let replies = sqlx::query("DELETE FROM replies WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete replies"))?;

        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete post"))?;

        tx.commit().await.map_err(db_error("commit post deletion"))?;

        Ok(Some(CascadeRemoval {
            media,
            likes_removed: reply_likes.rows_affected() + post_likes.rows_affected(),
            replies_removed: replies.rows_affected(),
        }))
    }

    async fn create_reply(&self, reply: &Reply) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO replies (id, post_id, owner_id, content, media, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reply.id)
        .bind(reply.post_id)
        .bind(reply.owner_id)
        .bind(&reply.content)
        .bind(encode_media(&reply.media)?)
        .bind(reply.created_at.timestamp_millis())
        .bind(reply.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error("create reply"))?;
        Ok(())
    }

    async fn get_reply(&self, id: EntityId) -> AppResult<Option<Reply>> {
        let row = sqlx::query(
            "SELECT id, post_id, owner_id, content, media, created_at, updated_at FROM replies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load reply"))?;
        row.as_ref()
            .map(reply_from_row)
            .transpose()
            .map_err(db_error("decode reply"))
    }

    async fn update_reply(&self, reply: &Reply) -> AppResult<()> {
        let result = sqlx::query("UPDATE replies SET content = ?, media = ?, updated_at = ? WHERE id = ?")
            .bind(&reply.content)
            .bind(encode_media(&reply.media)?)
            .bind(reply.updated_at.timestamp_millis())
            .bind(reply.id)
            .execute(&self.pool)
            .await
            .map_err(db_error("update reply"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reply {} not found", reply.id)));
        }
        Ok(())
    }

    async fn delete_reply_cascade(&self, id: EntityId) -> AppResult<Option<CascadeRemoval>> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let Some(row) = sqlx::query("SELECT media FROM replies WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("load reply"))?
        else {
            return Ok(None);
        };
        let media = decode_media(&row, "media").map_err(db_error("decode reply"))?;

        let likes = sqlx::query("DELETE FROM likes WHERE item_kind = ? AND liked_item = ?")
            .bind(LikeKind::Reply.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete reply likes"))?;

        sqlx::query("DELETE FROM replies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete reply"))?;

        tx.commit().await.map_err(db_error("commit reply deletion"))?;

        Ok(Some(CascadeRemoval {
            media,
            likes_removed: likes.rows_affected(),
            replies_removed: 1,
        }))
    }

    async fn find_like(&self, liked_by: EntityId, target: LikeTarget) -> AppResult<Option<Like>> {
        let row = sqlx::query(
            "SELECT id, created_at FROM likes WHERE liked_by = ? AND liked_item = ? AND item_kind = ?",
        )
        .bind(liked_by)
        .bind(target.id())
        .bind(target.kind().as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load like"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Like {
            id: row.try_get("id").map_err(db_error("decode like"))?,
            liked_by,
            target,
            created_at: millis_to_datetime(row.try_get("created_at").map_err(db_error("decode like"))?),
        }))
    }

    async fn create_like(&self, like: &Like) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO likes (id, liked_by, liked_item, item_kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(like.id)
        .bind(like.liked_by)
        .bind(like.target.id())
        .bind(like.target.kind().as_str())
        .bind(like.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_error("create like"))?;
        Ok(())
    }

    async fn delete_like(&self, id: EntityId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete like"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, target: LikeTarget) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE liked_item = ? AND item_kind = ?")
            .bind(target.id())
            .bind(target.kind().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count likes"))?;
        Ok(total.max(0) as u64)
    }

    async fn find_follow(&self, followed_by: EntityId, followed_to: EntityId) -> AppResult<Option<Follow>> {
        let row = sqlx::query("SELECT id, created_at FROM follows WHERE followed_by = ? AND followed_to = ?")
            .bind(followed_by)
            .bind(followed_to)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load follow edge"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Follow {
            id: row.try_get("id").map_err(db_error("decode follow edge"))?,
            followed_by,
            followed_to,
            created_at: millis_to_datetime(row.try_get("created_at").map_err(db_error("decode follow edge"))?),
        }))
    }

    async fn create_follow(&self, follow: &Follow) -> AppResult<()> {
        sqlx::query("INSERT INTO follows (id, followed_by, followed_to, created_at) VALUES (?, ?, ?, ?)")
            .bind(follow.id)
            .bind(follow.followed_by)
            .bind(follow.followed_to)
            .bind(follow.created_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(db_error("create follow edge"))?;
        Ok(())
    }

    async fn delete_follow(&self, id: EntityId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete follow edge"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn posts_by_owner(
        &self,
        owner: EntityId,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<QueryPage<PostView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE owner_id = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count posts"))?;

        let rows = sqlx::query(
            r#"
            SELECT p.id, p.content, p.media, p.created_at, p.updated_at,
                   u.id AS owner_id, u.username AS owner_username,
                   u.full_name AS owner_full_name, u.avatar AS owner_avatar,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.liked_item = p.id AND l.item_kind = 'Post') AS like_count,
                   (SELECT COUNT(*) FROM replies r WHERE r.post_id = p.id) AS reply_count,
                   EXISTS(SELECT 1 FROM likes l
                     WHERE l.liked_item = p.id AND l.item_kind = 'Post' AND l.liked_by = ?) AS is_liked
            FROM posts p
            JOIN users u ON u.id = p.owner_id
            WHERE p.owner_id = ?
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(viewer)
        .bind(owner)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list posts"))?;

        let docs = rows
            .iter()
            .map(|row| {
                Ok(PostView {
                    id: row.try_get("id")?,
                    content: row.try_get("content")?,
                    media: decode_media(row, "media")?,
                    owner: owner_from_row(row)?,
                    likes: count(row, "like_count")?,
                    replies: count(row, "reply_count")?,
                    is_liked: flag(row, "is_liked")?,
                    created_at: millis_to_datetime(row.try_get("created_at")?),
                    updated_at: millis_to_datetime(row.try_get("updated_at")?),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(db_error("decode posts"))?;

        Ok(QueryPage {
            rows: docs,
            total: total.max(0) as u64,
        })
    }

    async fn replies_for_post(
        &self,
        post: EntityId,
        viewer: Option<EntityId>,
        page: PageRequest,
    ) -> AppResult<QueryPage<ReplyView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE post_id = ?")
            .bind(post)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count replies"))?;

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.post_id, r.content, r.media, r.created_at, r.updated_at,
                   u.id AS owner_id, u.username AS owner_username,
                   u.full_name AS owner_full_name, u.avatar AS owner_avatar,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.liked_item = r.id AND l.item_kind = 'Reply') AS like_count,
                   EXISTS(SELECT 1 FROM likes l
                     WHERE l.liked_item = r.id AND l.item_kind = 'Reply' AND l.liked_by = ?) AS is_liked
            FROM replies r
            JOIN users u ON u.id = r.owner_id
            WHERE r.post_id = ?
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(viewer)
        .bind(post)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list replies"))?;

        let docs = rows
            .iter()
            .map(|row| {
                Ok(ReplyView {
                    id: row.try_get("id")?,
                    post: row.try_get("post_id")?,
                    content: row.try_get("content")?,
                    media: decode_media(row, "media")?,
                    owner: owner_from_row(row)?,
                    likes: count(row, "like_count")?,
                    is_liked: flag(row, "is_liked")?,
                    created_at: millis_to_datetime(row.try_get("created_at")?),
                    updated_at: millis_to_datetime(row.try_get("updated_at")?),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(db_error("decode replies"))?;

        Ok(QueryPage {
            rows: docs,
            total: total.max(0) as u64,
        })
    }

    async fn followers_of(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<QueryPage<FollowView>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows f JOIN users u ON u.id = f.followed_by WHERE f.followed_to = ?",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count followers"))?;

        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.username, u.full_name, u.avatar,
                   EXISTS(SELECT 1 FROM follows v
                     WHERE v.followed_by = ? AND v.followed_to = u.id) AS is_following
            FROM follows f
            JOIN users u ON u.id = f.followed_by
            WHERE f.followed_to = ?
            ORDER BY f.created_at DESC, f.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(viewer)
        .bind(user)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list followers"))?;

        let docs = rows
            .iter()
            .map(follow_view_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("decode followers"))?;

        Ok(QueryPage {
            rows: docs,
            total: total.max(0) as u64,
        })
    }

    async fn following_of(
        &self,
        user: EntityId,
        viewer: EntityId,
        page: PageRequest,
    ) -> AppResult<QueryPage<FollowView>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows f JOIN users u ON u.id = f.followed_to WHERE f.followed_by = ?",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count following"))?;

        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.username, u.full_name, u.avatar,
                   EXISTS(SELECT 1 FROM follows v
                     WHERE v.followed_by = ? AND v.followed_to = u.id) AS is_following
            FROM follows f
            JOIN users u ON u.id = f.followed_to
            WHERE f.followed_by = ?
            ORDER BY f.created_at DESC, f.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(viewer)
        .bind(user)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list following"))?;

        let docs = rows
            .iter()
            .map(follow_view_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("decode following"))?;

        Ok(QueryPage {
            rows: docs,
            total: total.max(0) as u64,
        })
    }

    async fn user_profile(&self, username: &str, viewer: Option<EntityId>) -> AppResult<Option<ProfileView>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.username, u.full_name, u.bio, u.avatar, u.cover_image, u.dob,
                   (SELECT COUNT(*) FROM follows f WHERE f.followed_to = u.id) AS follower_count,
                   (SELECT COUNT(*) FROM follows f WHERE f.followed_by = u.id) AS following_count,
                   EXISTS(SELECT 1 FROM follows f
                     WHERE f.followed_by = ? AND f.followed_to = u.id) AS is_following
            FROM users u
            WHERE u.username = ?
            "#,
        )
        .bind(viewer)
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load profile"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let profile = profile_from_row(&row).map_err(db_error("decode profile"))?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn database() -> SqliteDatabase {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn new_user(id: i64, username: &str) -> NewUser {
        NewUser {
            id: EntityId(id),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: username.to_uppercase(),
            password_hash: "hash".to_string(),
            avatar: format!("http://media/{}.png", username),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_insensitive_and_exact() {
        let db = database().await;
        db.create_user(new_user(1, "alice")).await.unwrap();

        assert!(db.find_user_by_username("ALICE").await.unwrap().is_some());
        assert!(db.find_user_by_username("ali").await.unwrap().is_none());

        let err = db.create_user(new_user(2, "Alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_refresh_token_set_and_clear() {
        let db = database().await;
        db.create_user(new_user(1, "alice")).await.unwrap();

        db.set_refresh_token(EntityId(1), Some("token")).await.unwrap();
        let user = db.get_user(EntityId(1)).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("token"));

        db.set_refresh_token(EntityId(1), None).await.unwrap();
        let user = db.get_user(EntityId(1)).await.unwrap().unwrap();
        assert_eq!(user.refresh_token, None);

        let missing = db.set_refresh_token(EntityId(99), None).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_post_cascade_removes_replies_and_likes() {
        let db = database().await;
        db.create_user(new_user(1, "alice")).await.unwrap();
        let now = Utc::now();

        let post = Post {
            id: EntityId(10),
            owner_id: EntityId(1),
            content: "hello".into(),
            media: vec![MediaItem::new("http://media/p.png")],
            created_at: now,
            updated_at: now,
        };
        db.create_post(&post).await.unwrap();
        db.create_reply(&Reply {
            id: EntityId(20),
            post_id: post.id,
            owner_id: EntityId(1),
            content: "reply".into(),
            media: vec![MediaItem::new("http://media/r.png")],
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
        for (id, target) in [(30, LikeTarget::Post(EntityId(10))), (31, LikeTarget::Reply(EntityId(20)))] {
            db.create_like(&Like {
                id: EntityId(id),
                liked_by: EntityId(1),
                target,
                created_at: now,
            })
            .await
            .unwrap();
        }

        let removal = db.delete_post_cascade(post.id).await.unwrap().unwrap();
        assert_eq!(removal.likes_removed, 2);
        assert_eq!(removal.replies_removed, 1);
        assert_eq!(removal.media.len(), 2);

        assert!(db.get_post(post.id).await.unwrap().is_none());
        assert!(db.get_reply(EntityId(20)).await.unwrap().is_none());
        assert_eq!(db.count_likes(LikeTarget::Post(post.id)).await.unwrap(), 0);
        assert!(db.delete_post_cascade(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_follow_edge_is_conflict() {
        let db = database().await;
        let edge = Follow {
            id: EntityId(1),
            followed_by: EntityId(5),
            followed_to: EntityId(6),
            created_at: Utc::now(),
        };
        db.create_follow(&edge).await.unwrap();

        let duplicate = Follow { id: EntityId(2), ..edge };
        assert!(matches!(db.create_follow(&duplicate).await, Err(AppError::Conflict(_))));
    }
}
