// Local Media Store - Keeps blobs in a directory served under /media

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::infrastructure::media::{public_id_from_locator, MediaAsset, MediaError, MediaStore};

pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, path: &Path) -> Result<MediaAsset, MediaError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let public_id = Uuid::new_v4().simple().to_string();
        let file_name = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", public_id, ext.to_lowercase()),
            None => public_id.clone(),
        };

        tokio::fs::copy(path, self.root.join(&file_name)).await?;
        debug!("Stored {} as {}", path.display(), file_name);

        Ok(MediaAsset {
            url: format!("{}/{}", self.base_url, file_name),
            public_id,
        })
    }

    async fn delete(&self, locator: &str) -> Result<(), MediaError> {
        let Some(public_id) = public_id_from_locator(locator) else {
            return Ok(());
        };

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|stem| stem.to_str()) == Some(public_id) {
                tokio::fs::remove_file(&path).await?;
                debug!("Removed {}", path.display());
            }
        }
        Ok(())
    }
}
