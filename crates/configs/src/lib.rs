//! # configs
//!
//! Layered settings. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml`
//! 3. `config/{RUSTY_BLOG_ENV}.toml` (`RUSTY_BLOG_ENV` defaults to `development`)
//! 4. environment variables such as `RUSTY_BLOG__SERVER__PORT=8080`
//!
//! A `.env` file, if present, is loaded into the environment first.

use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "RUSTY_BLOG";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret_string")]
    pub jwt_secret: SecretString,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info,sqlx=warn`
    pub filter: String,
    pub json: bool,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("no .env file loaded: {e}");
        }
        Self::load_with_overrides(&[])
    }

    /// Same layering as [`Settings::load`] without reading `.env`, with
    /// explicit overrides applied last.
    pub fn load_with_overrides(overrides: &[(&str, &str)]) -> Result<Self, SettingsError> {
        let run_env = std::env::var(format!("{ENV_PREFIX}_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000_i64)?
            .set_default("server.cors_origins", vec!["*"])?
            .set_default("database.backend", "memory")?
            .set_default("database.url", "sqlite:rusty_blog.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("auth.token_ttl_secs", 7_i64 * 24 * 3600)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(SettingsError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(SettingsError::Invalid("auth.token_ttl_secs must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(SettingsError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.database.backend == StorageBackend::Sqlite && self.database.url.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "database.url is required for the sqlite backend".into(),
            ));
        }
        if self.server.cors_origins.iter().any(|o| o == "*") && self.server.cors_origins.len() > 1 {
            warn!("cors_origins contains '*'; other origins are ignored");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
