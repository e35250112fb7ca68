// AuthService - Registration, login and the access/refresh token lifecycle
// A user holds at most one live refresh token; issuing a new pair supersedes the old one

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::EntityId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    CredentialHasher, DatabaseInterface, EntityIdGenerator, MediaStore, TokenPair, TokenService,
};
use crate::models::{NewUser, PublicUser, User};
use crate::services::{delete_all, upload_all};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation("Email is not valid".to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Sanitized user plus the freshly issued token pair
#[derive(Debug, Clone)]
pub struct Session {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn DatabaseInterface>,
    media: Arc<dyn MediaStore>,
    ids: Arc<EntityIdGenerator>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        media: Arc<dyn MediaStore>,
        ids: Arc<EntityIdGenerator>,
        hasher: CredentialHasher,
        tokens: TokenService,
    ) -> Self {
        Self {
            db,
            media,
            ids,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[instrument(skip(self, registration, avatar, cover_image), fields(username = %registration.username))]
    pub async fn register(
        &self,
        registration: Registration,
        avatar: Option<&Path>,
        cover_image: Option<&Path>,
    ) -> AppResult<Session> {
        let username = normalize_identity(&registration.username);
        let email = normalize_identity(&registration.email);
        let full_name = registration.full_name.trim().to_string();

        if username.is_empty()
            || email.is_empty()
            || full_name.is_empty()
            || registration.password.trim().is_empty()
        {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        validate_email(&email)?;

        if self
            .db
            .find_user_by_identity(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let Some(avatar) = avatar else {
            return Err(AppError::Validation("Avatar is required".to_string()));
        };

        let files: Vec<_> = std::iter::once(avatar)
            .chain(cover_image)
            .map(Path::to_path_buf)
            .collect();
        let mut assets = upload_all(self.media.as_ref(), &files).await?.into_iter();
        let avatar_url = assets.next().map(|asset| asset.url).unwrap_or_default();
        let cover_url = assets.next().map(|asset| asset.url);

        let created = match self.hasher.hash(&registration.password) {
            Ok(password_hash) => {
                self.db
                    .create_user(NewUser {
                        id: self.ids.next_id(),
                        username,
                        email,
                        full_name,
                        password_hash,
                        avatar: avatar_url.clone(),
                        cover_image: cover_url.clone(),
                    })
                    .await
            }
            Err(err) => Err(err),
        };

        let mut user = match created {
            Ok(user) => user,
            Err(err) => {
                let uploaded: Vec<String> = std::iter::once(avatar_url).chain(cover_url).collect();
                delete_all(self.media.as_ref(), &uploaded).await;
                return Err(err);
            }
        };

        let tokens = self.issue_tokens(&mut user).await?;
        info!("User {} registered", user.id);
        Ok(Session {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    /// Either identifier may be used. Unknown users and wrong passwords get the same answer.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> AppResult<Session> {
        let username = username.map(normalize_identity).filter(|value| !value.is_empty());
        let email = email.map(normalize_identity).filter(|value| !value.is_empty());
        if (username.is_none() && email.is_none()) || password.is_empty() {
            return Err(AppError::Validation(
                "Username or email and password are required".to_string(),
            ));
        }

        let mut user = self
            .db
            .find_user_by_identity(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!("Failed login for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let tokens = self.issue_tokens(&mut user).await?;
        info!("User {} logged in", user.id);
        Ok(Session {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    /// Signs a new pair and persists the refresh token as the only valid one
    pub async fn issue_tokens(&self, user: &mut User) -> AppResult<TokenPair> {
        let pair = self.tokens.issue_pair(user)?;
        self.db
            .set_refresh_token(user.id, Some(&pair.refresh_token))
            .await?;
        user.refresh_token = Some(pair.refresh_token.clone());
        Ok(pair)
    }

    #[instrument(skip(self, presented))]
    pub async fn refresh(&self, presented: Option<&str>) -> AppResult<Session> {
        let presented = presented
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

        let claims = self.tokens.verify_refresh(presented)?;
        let mut user = self
            .db
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!("Stale refresh token presented for user {}", user.id);
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let tokens = self.issue_tokens(&mut user).await?;
        Ok(Session {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: EntityId) -> AppResult<()> {
        self.db.set_refresh_token(user_id, None).await?;
        info!("User {} logged out", user_id);
        Ok(())
    }

    /// The refresh token stays valid; only the stored hash changes
    #[instrument(skip(self, current, new))]
    pub async fn change_password(&self, user_id: EntityId, current: &str, new: &str) -> AppResult<()> {
        if current.is_empty() || new.is_empty() {
            return Err(AppError::Validation("Both passwords are required".to_string()));
        }
        if current == new {
            return Err(AppError::Validation(
                "New password cannot be the same as the current password".to_string(),
            ));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self.hasher.verify(current, &user.password_hash)? {
            return Err(AppError::Unauthorized("Incorrect password".to_string()));
        }

        let password_hash = self.hasher.hash(new)?;
        self.db.set_password_hash(user_id, &password_hash).await?;
        info!("User {} changed password", user_id);
        Ok(())
    }

    /// Resolves the user behind an access token; the user must still exist
    pub async fn authenticate(&self, access_token: &str) -> AppResult<User> {
        let claims = self.tokens.verify_access(access_token)?;
        self.db
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.de").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_identity("  Alice "), "alice");
    }
}
