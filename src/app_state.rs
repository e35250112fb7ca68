use std::sync::Arc;

use crate::{
    config::{Config, MediaProvider},
    error::{AppError, AppResult},
    infrastructure::{
        build_media_store, middleware::HasAuthService, CredentialHasher, DatabaseInterface,
        EntityIdGenerator, MediaStore, SqliteDatabase, TokenService,
    },
    services::{
        AuthService, FeedService, LikeService, PostService, RelationshipService, ReplyService,
        UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseInterface>,
    pub media: Arc<dyn MediaStore>,
    pub auth: AuthService,
    pub users: UserService,
    pub relationships: RelationshipService,
    pub feed: FeedService,
    pub posts: PostService,
    pub replies: ReplyService,
    pub likes: LikeService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database = SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
        database.initialize().await?;
        let db: Arc<dyn DatabaseInterface> = Arc::new(database);

        tokio::fs::create_dir_all(&config.media.upload_dir).await?;
        if config.media.provider == MediaProvider::Local {
            tokio::fs::create_dir_all(&config.media.local_dir).await?;
        }
        let media = build_media_store(&config.media)?;

        Ok(Self::from_parts(config, db, media)?)
    }

    /// Wires services over an already initialized store
    pub fn from_parts(config: Config, db: Arc<dyn DatabaseInterface>, media: Arc<dyn MediaStore>) -> AppResult<Self> {
        if config.auth.access_token_secret.is_empty() || config.auth.refresh_token_secret.is_empty() {
            return Err(AppError::ConfigurationError("Token secrets must not be empty".to_string()));
        }
        let ids = Arc::new(EntityIdGenerator::new(config.server.node_id));
        let hasher = CredentialHasher::from_config(&config.auth)?;
        let tokens = TokenService::new((&config.auth).into());

        Ok(Self {
            auth: AuthService::new(db.clone(), media.clone(), ids.clone(), hasher, tokens),
            users: UserService::new(db.clone(), media.clone()),
            relationships: RelationshipService::new(db.clone(), ids.clone()),
            feed: FeedService::new(db.clone()),
            posts: PostService::new(db.clone(), media.clone(), ids.clone()),
            replies: ReplyService::new(db.clone(), media.clone(), ids.clone()),
            likes: LikeService::new(db.clone(), ids),
            config: Arc::new(config),
            db,
            media,
        })
    }
}

impl HasAuthService for AppState {
    fn auth_service(&self) -> &AuthService {
        &self.auth
    }
}
