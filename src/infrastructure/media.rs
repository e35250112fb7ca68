// Media Store - Object storage contract for user-uploaded blobs
// Upload returns a public locator; delete takes that locator back

use async_trait::async_trait;
use rand::Rng;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{MediaConfig, MediaProvider};
use crate::infrastructure::cloudinary::CloudinaryMediaStore;
use crate::infrastructure::local_media::LocalMediaStore;

/// A stored blob: the public URL plus the identifier the host knows it by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug)]
pub enum MediaError {
    Io(std::io::Error),
    Http(String),
    /// The host answered but refused the request
    Rejected { status: u16, message: String },
}

impl MediaError {
    /// Transport failures and 5xx/429 answers are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaError::Io(_) | MediaError::Http(_) => true,
            MediaError::Rejected { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Io(err) => write!(f, "I/O error: {}", err),
            MediaError::Http(msg) => write!(f, "HTTP error: {}", msg),
            MediaError::Rejected { status, message } => {
                write!(f, "Media host rejected request ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err)
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Http(err.to_string())
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the file at `path` and return where it can be fetched from
    async fn upload(&self, path: &Path) -> Result<MediaAsset, MediaError>;

    /// Remove the blob behind `locator`. Unknown locators are not an error.
    async fn delete(&self, locator: &str) -> Result<(), MediaError>;
}

/// `http://host/dir/abc123.png` -> `abc123`
pub fn public_id_from_locator(locator: &str) -> Option<&str> {
    let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
    let segment = without_query.trim_end_matches('/').rsplit('/').next()?;
    let stem = match segment.rfind('.') {
        Some(0) | None => segment,
        Some(dot) => &segment[..dot],
    };
    (!stem.is_empty()).then_some(stem)
}

/// Exponential backoff with full jitter, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        }
    }

    /// Upper bound of the sleep before retry number `attempt` (0-indexed)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(ceiling / 2..=ceiling))
    }
}

/// Wraps any store with bounded retries on transient failures
pub struct RetryingMediaStore {
    inner: Arc<dyn MediaStore>,
    policy: RetryPolicy,
}

impl RetryingMediaStore {
    pub fn new(inner: Arc<dyn MediaStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl MediaStore for RetryingMediaStore {
    async fn upload(&self, path: &Path) -> Result<MediaAsset, MediaError> {
        let mut attempt = 0;
        loop {
            match self.inner.upload(path).await {
                Ok(asset) => return Ok(asset),
                Err(err) if err.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    warn!("Upload of {} failed (attempt {}): {}", path.display(), attempt + 1, err);
                    tokio::time::sleep(self.policy.jittered(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn delete(&self, locator: &str) -> Result<(), MediaError> {
        let mut attempt = 0;
        loop {
            match self.inner.delete(locator).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    warn!("Delete of {} failed (attempt {}): {}", locator, attempt + 1, err);
                    tokio::time::sleep(self.policy.jittered(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Builds the configured provider wrapped in the retry decorator
pub fn build_media_store(config: &MediaConfig) -> Result<Arc<dyn MediaStore>, MediaError> {
    let inner: Arc<dyn MediaStore> = match (&config.provider, &config.cloudinary) {
        (MediaProvider::Cloudinary, Some(cloudinary)) => {
            Arc::new(CloudinaryMediaStore::new(cloudinary.clone())?)
        }
        (MediaProvider::Cloudinary, None) => {
            return Err(MediaError::Http("Cloudinary credentials are not configured".to_string()))
        }
        (MediaProvider::Local, _) => Arc::new(LocalMediaStore::new(
            config.local_dir.clone(),
            config.public_base_url.clone(),
        )),
    };

    Ok(Arc::new(RetryingMediaStore::new(inner, RetryPolicy::from_config(config))))
}
