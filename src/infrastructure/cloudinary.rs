// Cloudinary Media Store - Signed uploads and deletes against the Cloudinary REST API

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::CloudinaryConfig;
use crate::core::current_time_millis;
use crate::infrastructure::media::{public_id_from_locator, MediaAsset, MediaError, MediaStore};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryMediaStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryMediaStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    /// Cloudinary signature: sha1 over the sorted params followed by the secret
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/{}", API_BASE, self.config.cloud_name, action)
    }
}

async fn rejected(response: reqwest::Response) -> MediaError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    MediaError::Rejected { status, message }
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    #[instrument(skip(self))]
    async fn upload(&self, path: &Path) -> Result<MediaAsset, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let timestamp = (current_time_millis() / 1000).to_string();
        let signature = self.sign(&[("timestamp", &timestamp)]);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_ref())?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("auto/upload"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let body: UploadResponse = response.json().await?;
        debug!("Uploaded {} as {}", path.display(), body.public_id);
        Ok(MediaAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, locator: &str) -> Result<(), MediaError> {
        let Some(public_id) = public_id_from_locator(locator) else {
            return Ok(());
        };
        let destroy = format!("{}/destroy", resource_type_from_locator(locator));

        let timestamp = (current_time_millis() / 1000).to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let response = self
            .client
            .post(self.endpoint(&destroy))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        // "not found" means it is already gone
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Rejected {
                status: 200,
                message: other.to_string(),
            }),
        }
    }
}

/// Delivery URLs look like `.../<resource_type>/upload/...`; destroy must name the same type
fn resource_type_from_locator(locator: &str) -> &str {
    locator
        .split_once("/upload/")
        .and_then(|(head, _)| head.rsplit('/').next())
        .filter(|kind| matches!(*kind, "image" | "video" | "raw"))
        .unwrap_or("image")
}
