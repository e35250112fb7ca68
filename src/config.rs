use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEV_ACCESS_SECRET: &str = "threadline-dev-access-secret";
const DEV_REFRESH_SECRET: &str = "threadline-dev-refresh-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Node bits stamped into generated ids
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_secret: String,
    pub refresh_token_ttl: Duration,
    pub cookie_secure: bool,
    /// Argon2 memory cost in KiB
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaProvider {
    Local,
    Cloudinary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub provider: MediaProvider,
    /// Where the local provider keeps blobs
    pub local_dir: PathBuf,
    /// URL prefix the local provider hands out as locators
    pub public_base_url: String,
    /// Staging directory for multipart uploads
    pub upload_dir: PathBuf,
    pub cloudinary: Option<CloudinaryConfig>,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = env_or("SERVER_PORT", "3000").parse().unwrap_or(3000);

        let access_token_ttl = parse_duration(&env_or("ACCESS_TOKEN_EXPIRY", "1d"))
            .ok_or_else(|| anyhow::anyhow!("ACCESS_TOKEN_EXPIRY is not a valid duration"))?;
        let refresh_token_ttl = parse_duration(&env_or("REFRESH_TOKEN_EXPIRY", "10d"))
            .ok_or_else(|| anyhow::anyhow!("REFRESH_TOKEN_EXPIRY is not a valid duration"))?;

        let provider = match env_or("MEDIA_PROVIDER", "local").to_lowercase().as_str() {
            "local" => MediaProvider::Local,
            "cloudinary" => MediaProvider::Cloudinary,
            other => anyhow::bail!("Unknown MEDIA_PROVIDER '{}'", other),
        };

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };
        if provider == MediaProvider::Cloudinary && cloudinary.is_none() {
            anyhow::bail!("MEDIA_PROVIDER=cloudinary requires CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET");
        }

        Ok(Self {
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite:data/threadline.db"),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", "5").parse().unwrap_or(5),
            },
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port,
                cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
                node_id: env_or("NODE_ID", "1").parse().unwrap_or(1),
            },
            auth: AuthConfig {
                access_token_secret: secret_or_dev("ACCESS_TOKEN_SECRET", DEV_ACCESS_SECRET),
                access_token_ttl,
                refresh_token_secret: secret_or_dev("REFRESH_TOKEN_SECRET", DEV_REFRESH_SECRET),
                refresh_token_ttl,
                cookie_secure: env_or("COOKIE_SECURE", "true") != "false",
                password_memory_kib: env_or("PASSWORD_HASH_MEMORY_KIB", "19456").parse().unwrap_or(19456),
                password_iterations: env_or("PASSWORD_HASH_ITERATIONS", "2").parse().unwrap_or(2),
            },
            media: MediaConfig {
                provider,
                local_dir: PathBuf::from(env_or("MEDIA_DIR", "public/media")),
                public_base_url: env::var("MEDIA_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}/media", port)),
                upload_dir: PathBuf::from(env_or("UPLOAD_TEMP_DIR", "public/temp")),
                cloudinary,
                retry_attempts: env_or("MEDIA_RETRY_ATTEMPTS", "3").parse().unwrap_or(3),
                retry_base_delay: Duration::from_millis(
                    env_or("MEDIA_RETRY_BASE_MS", "200").parse().unwrap_or(200),
                ),
                retry_max_delay: Duration::from_secs(2),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn secret_or_dev(key: &str, dev_default: &str) -> String {
    match env::var(key) {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::warn!("{} is not set, falling back to a development secret", key);
            dev_default.to_string()
        }
    }
}

/// Parses `90`, `45s`, `15m`, `12h` or `10d`
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let seconds = match unit.trim() {
        "" | "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        "d" => value.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("12h"), Some(Duration::from_secs(43_200)));
        assert_eq!(parse_duration("10d"), Some(Duration::from_secs(864_000)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("d"), None);
        assert_eq!(parse_duration("5w"), None);
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("999999999999999999d"), None);
        assert_eq!(parse_duration("18446744073709551615m"), None);
        assert_eq!(
            parse_duration("18446744073709551615"),
            Some(Duration::from_secs(u64::MAX))
        );
    }
}
