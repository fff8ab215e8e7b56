//! # configs
//!
//! Layered settings for the board, built once at startup and handed to each
//! adapter. Sources, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. `rusty-board.toml` in the working directory (optional)
//! 3. `BOARD__SECTION__KEY` environment variables (a `.env` file is loaded first)

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Upper bound for `media.url_ttl_secs`: seven days, the longest lifetime
/// S3 accepts for a presigned URL.
pub const MAX_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection string, e.g. `sqlite://rusty_board.db?mode=rwc`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Memory,
    Local,
    S3,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub backend: MediaBackend,
    /// Root directory of the `local` backend.
    pub local_root: PathBuf,
    /// Prepended to `/media/...` in signed URLs; empty keeps them relative.
    pub public_base_url: String,
    /// HMAC key for URLs issued by the `memory` and `local` backends.
    pub signing_key: SecretString,
    pub url_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub s3: S3Settings,
}

impl MediaSettings {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    pub bucket: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2).
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Shared secret for the `admin` basic-auth user.
    pub password: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name("rusty-board").required(false))
            .add_source(
                Environment::with_prefix("BOARD")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// The built-in defaults. Everything except `auth.password` has one.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.url", "sqlite://rusty_board.db?mode=rwc")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("media.backend", "local")?
            .set_default("media.local_root", "./data/uploads")?
            .set_default("media.public_base_url", "")?
            .set_default("media.signing_key", "")?
            .set_default("media.url_ttl_secs", 3600_i64)?
            .set_default("media.max_upload_bytes", 10_i64 * 1024 * 1024)?
            .set_default("media.s3.region", "us-east-1")?
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.password.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("auth.password must not be empty".into()));
        }
        if self.media.url_ttl_secs == 0 || self.media.url_ttl_secs > MAX_URL_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "media.url_ttl_secs must be between 1 and {MAX_URL_TTL_SECS}"
            )));
        }
        match self.media.backend {
            MediaBackend::S3 if self.media.s3.bucket.as_deref().unwrap_or("").is_empty() => {
                Err(ConfigError::Invalid(
                    "media.s3.bucket is required for the s3 backend".into(),
                ))
            }
            MediaBackend::Memory | MediaBackend::Local
                if self.media.signing_key.expose_secret().is_empty() =>
            {
                Err(ConfigError::Invalid(
                    "media.signing_key is required for the memory and local backends".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secrets() -> ConfigBuilder<DefaultState> {
        Settings::defaults()
            .unwrap()
            .set_override("auth.password", "hunter2")
            .unwrap()
            .set_override("media.signing_key", "sign-me")
            .unwrap()
    }

    #[test]
    fn defaults_fill_everything_but_secrets() {
        let settings = Settings::from_builder(with_secrets()).unwrap();
        assert_eq!(settings.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(settings.media.backend, MediaBackend::Local);
        assert_eq!(settings.media.url_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.media.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!settings.logging.json);
    }

    #[test]
    fn missing_password_is_rejected() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("media.signing_key", "sign-me")
            .unwrap();
        assert!(Settings::from_builder(builder).is_err());
    }

    #[test]
    fn empty_password_is_rejected() {
        let builder = with_secrets().set_override("auth.password", "").unwrap();
        let err = Settings::from_builder(builder).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn s3_backend_requires_a_bucket() {
        let builder = with_secrets().set_override("media.backend", "s3").unwrap();
        let err = Settings::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("media.s3.bucket"));

        let builder = with_secrets()
            .set_override("media.backend", "s3")
            .unwrap()
            .set_override("media.s3.bucket", "board-media")
            .unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.media.s3.bucket.as_deref(), Some("board-media"));
    }

    #[test]
    fn url_ttl_is_bounded() {
        let builder = with_secrets().set_override("media.url_ttl_secs", 0_i64).unwrap();
        assert!(Settings::from_builder(builder).is_err());

        let builder = with_secrets()
            .set_override("media.url_ttl_secs", 10_000_000_000_000_i64)
            .unwrap();
        let err = Settings::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("media.url_ttl_secs"));

        let builder = with_secrets()
            .set_override("media.url_ttl_secs", MAX_URL_TTL_SECS as i64)
            .unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.media.url_ttl(), Duration::from_secs(MAX_URL_TTL_SECS));
    }

    #[test]
    fn local_backend_requires_a_signing_key() {
        let builder = with_secrets().set_override("media.signing_key", "").unwrap();
        assert!(Settings::from_builder(builder).is_err());
    }
}
