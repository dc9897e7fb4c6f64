use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PHARMA_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default path
    ///
    /// Layers, lowest priority first:
    /// 1. `AppConfig::development()` (or `production()` when `PHARMA_ENVIRONMENT=production`)
    /// 2. `./pharmaconnect.toml`
    /// 3. `PHARMA_` environment variables, `__` separating nested keys
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// Load from a given file
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(Self::base_config(), path.as_ref()).extract()
    }

    fn base_config() -> AppConfig {
        match std::env::var("PHARMA_ENVIRONMENT").as_deref() {
            Ok("production") => AppConfig::production(),
            _ => AppConfig::development(),
        }
    }

    fn figment(base: AppConfig, path: &Path) -> Figment {
        Figment::from(Serialized::defaults(base))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate a loaded configuration
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.server.max_request_size == 0 {
            return Err(ConfigValidationError::InvalidRequestSize);
        }

        if config.database.backend == "surrealdb" && config.database.url.is_empty() {
            return Err(ConfigValidationError::MissingDatabaseUrl);
        }

        if config.security.jwt_secret.len() < 32 {
            return Err(ConfigValidationError::WeakJwtSecret);
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigValidationError::InvalidDimension);
        }

        if config.knowledge.max_chunk_chars == 0 {
            return Err(ConfigValidationError::InvalidChunkSize);
        }

        if config.security.rate_limit_enabled
            && (config.security.rate_limit_max_calls == 0
                || config.security.rate_limit_window_secs == 0)
        {
            return Err(ConfigValidationError::InvalidRateLimit);
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("server port must be greater than 0")]
    InvalidPort,
    #[error("max request size must be greater than 0")]
    InvalidRequestSize,

    #[error("database url is not configured")]
    MissingDatabaseUrl,

    #[error("jwt secret must be at least 32 characters")]
    WeakJwtSecret,

    #[error("embedding dimension must be greater than 0")]
    InvalidDimension,

    #[error("knowledge chunk size must be greater than 0")]
    InvalidChunkSize,

    #[error("rate limit needs a positive call budget and window")]
    InvalidRateLimit,
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    PathBuf::from("pharmaconnect.toml")
}
