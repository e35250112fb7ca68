#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use threadline::app_state::AppState;
use threadline::config::{AuthConfig, Config, DatabaseConfig, MediaConfig, MediaProvider, ServerConfig};
use threadline::core::EntityId;
use threadline::infrastructure::{DatabaseInterface, MediaAsset, MediaError, MediaStore, SqliteDatabase};
use threadline::services::{Registration, Session};

/// In-memory media host that remembers what it was asked to do
#[derive(Default)]
pub struct RecordingMediaStore {
    counter: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl RecordingMediaStore {
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn upload(&self, _path: &Path) -> Result<MediaAsset, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Rejected {
                status: 400,
                message: "unsupported file".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let asset = MediaAsset {
            url: format!("http://media.test/blob{}.png", n),
            public_id: format!("blob{}", n),
        };
        self.uploaded.lock().unwrap().push(asset.url.clone());
        Ok(asset)
    }

    async fn delete(&self, locator: &str) -> Result<(), MediaError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MediaError::Http("connection reset".to_string()));
        }
        self.deleted.lock().unwrap().push(locator.to_string());
        Ok(())
    }
}

pub fn test_config(upload_dir: PathBuf) -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origin: None,
            node_id: 7,
        },
        auth: AuthConfig {
            access_token_secret: "test-access-secret".to_string(),
            access_token_ttl: Duration::from_secs(900),
            refresh_token_secret: "test-refresh-secret".to_string(),
            refresh_token_ttl: Duration::from_secs(86_400),
            cookie_secure: false,
            // Cheapest argon2 parameters so the suite stays fast
            password_memory_kib: 8,
            password_iterations: 1,
        },
        media: MediaConfig {
            provider: MediaProvider::Local,
            local_dir: upload_dir.join("media"),
            public_base_url: "http://localhost/media".to_string(),
            upload_dir,
            cloudinary: None,
            retry_attempts: 1,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(1),
        },
    }
}

pub struct TestApp {
    pub state: AppState,
    pub media: Arc<RecordingMediaStore>,
    pub db: Arc<dyn DatabaseInterface>,
    // Keeps the staging directory alive for the test's duration
    pub dir: tempfile::TempDir,
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let database = SqliteDatabase::new_in_memory().await.unwrap();
    database.initialize().await.unwrap();
    let db: Arc<dyn DatabaseInterface> = Arc::new(database);
    let media = Arc::new(RecordingMediaStore::default());

    let state = AppState::from_parts(test_config(dir.path().to_path_buf()), db.clone(), media.clone()).unwrap();
    TestApp { state, media, db, dir }
}

impl TestApp {
    pub async fn register(&self, username: &str) -> Session {
        self.state
            .auth
            .register(
                Registration {
                    username: username.to_string(),
                    email: format!("{}@example.com", username.to_lowercase()),
                    password: "correct horse".to_string(),
                    full_name: format!("{} Example", username),
                },
                Some(Path::new("avatar.png")),
                None,
            )
            .await
            .unwrap()
    }

    pub async fn register_id(&self, username: &str) -> EntityId {
        self.register(username).await.user.id
    }

    pub fn media_files(&self, count: usize) -> Vec<PathBuf> {
        (0..count).map(|i| PathBuf::from(format!("photo{}.png", i))).collect()
    }
}
