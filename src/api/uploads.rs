// Multipart staging - file parts land in temp files under the upload dir,
// removed again when the form is dropped

use axum::extract::{FromRequest, Multipart, Request};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};

pub struct StagedFile {
    pub field: String,
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[derive(Default)]
pub struct MultipartForm {
    texts: HashMap<String, Vec<String>>,
    files: Vec<StagedFile>,
}

fn multipart_error(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", err))
}

/// Keeps the extension so the media store can guess the content type
fn staged_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

impl MultipartForm {
    pub async fn stage(mut multipart: Multipart, upload_dir: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create upload dir: {}", e)))?;

        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);

            match file_name {
                Some(original_name) if !original_name.is_empty() => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if bytes.is_empty() {
                        continue;
                    }
                    let file = tempfile::Builder::new()
                        .prefix("upload-")
                        .suffix(&staged_suffix(&original_name))
                        .tempfile_in(upload_dir)
                        .map_err(|e| AppError::Internal(format!("Cannot stage upload: {}", e)))?;
                    tokio::fs::write(file.path(), &bytes)
                        .await
                        .map_err(|e| AppError::Internal(format!("Cannot stage upload: {}", e)))?;
                    debug!("Staged {} ({} bytes) for field {}", original_name, bytes.len(), name);
                    form.files.push(StagedFile { field: name, file });
                }
                _ => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.texts.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for a repeated field, accepting both `name` and `name[]`
    pub fn texts(&self, name: &str) -> Vec<String> {
        let bracketed = format!("{}[]", name);
        [name, bracketed.as_str()]
            .iter()
            .filter_map(|key| self.texts.get(*key))
            .flatten()
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|staged| staged.field == name)
            .map(StagedFile::path)
    }

    pub fn files(&self, name: &str) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|staged| staged.field == name)
            .map(|staged| staged.path().to_path_buf())
            .collect()
    }
}

impl FromRequest<AppState> for MultipartForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::stage(multipart, &state.config.media.upload_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_suffix() {
        assert_eq!(staged_suffix("photo.JPG"), ".jpg");
        assert_eq!(staged_suffix("archive.tar.gz"), ".gz");
        assert_eq!(staged_suffix("noext"), "");
        assert_eq!(staged_suffix("weird.p$g"), "");
    }

    #[test]
    fn test_repeated_text_fields() {
        let mut form = MultipartForm::default();
        form.texts.insert("removeMedia".into(), vec!["a".into()]);
        form.texts.insert("removeMedia[]".into(), vec!["b".into(), " ".into()]);

        assert_eq!(form.texts("removeMedia"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(form.text("removeMedia"), Some("a"));
        assert_eq!(form.text("content"), None);
    }
}
