// Security - Credential hashing and signed session tokens
// Access and refresh tokens use independent secrets and lifetimes

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::core::{current_time_millis, EntityId};
use crate::error::{AppError, AppResult};
use crate::models::User;

/// argon2id with tunable cost
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Parameters are read back from the stored hash, so old hashes keep verifying
    pub fn verify(&self, password: &str, stored_hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: EntityId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: EntityId,
    /// Unique per issue so two refreshes in the same second still differ
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

impl From<&AuthConfig> for TokenConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_ttl: config.access_token_ttl,
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl: config.refresh_token_ttl,
        }
    }
}

/// HS256 signer/verifier for both token kinds
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        let now = (current_time_millis() / 1000) as u64;

        let access = AccessClaims {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now.saturating_add(self.access_ttl.as_secs()),
        };
        let refresh = RefreshClaims {
            user_id: user.id,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(self.refresh_ttl.as_secs()),
        };

        let access_token = encode(&Header::default(), &access, &self.access_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))?;
        let refresh_token = encode(&Header::default(), &refresh, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: EntityId(42),
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: "Alice".into(),
            password_hash: String::new(),
            avatar: "http://media/a.png".into(),
            cover_image: None,
            bio: None,
            dob: None,
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(TokenConfig {
            access_secret: "access".into(),
            access_ttl: Duration::from_secs(60),
            refresh_secret: "refresh".into(),
            refresh_ttl: Duration::from_secs(600),
        })
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = CredentialHasher::new(1024, 1).unwrap();
        let hash = hasher.hash("hunter2").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2", &hash).unwrap());
        assert!(!hasher.verify("hunter3", &hash).unwrap());
        assert_ne!(hash, hasher.hash("hunter2").unwrap());
    }

    #[test]
    fn test_token_pair_round_trip() {
        let service = tokens();
        let pair = service.issue_pair(&user()).unwrap();

        let access = service.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.user_id, EntityId(42));
        assert_eq!(access.username, "alice");

        let refresh = service.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.user_id, EntityId(42));
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let service = tokens();
        let pair = service.issue_pair(&user()).unwrap();

        assert!(service.verify_access(&pair.refresh_token).is_err());
        assert!(service.verify_refresh(&pair.access_token).is_err());
        assert!(service.verify_access("garbage").is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let service = tokens();
        let first = service.issue_pair(&user()).unwrap();
        let second = service.issue_pair(&user()).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
    }
}
