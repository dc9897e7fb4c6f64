use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend type: "memory" or "surrealdb"
    pub backend: String,
    /// SurrealDB endpoint (e.g. `http://localhost:8000` or `mem://`)
    pub url: String,
    /// Namespace
    pub namespace: String,
    /// Database name
    pub database: String,
    /// Root user
    pub username: String,
    /// Root password
    pub password: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_request_size: usize,
    /// Base URL used when functions re-invoke other functions
    pub functions_base_url: String,
}

/// Authentication and throttling
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// HS256 secret used to sign and verify access tokens
    pub jwt_secret: String,
    /// Expected `aud` claim
    pub jwt_audience: String,
    /// Lifetime of tokens minted by the service itself (seconds)
    pub service_token_ttl: u64,
    /// Whether the per-function rate limiter is active
    pub rate_limit_enabled: bool,
    /// Calls allowed per user and function inside one window
    pub rate_limit_max_calls: u32,
    /// Window length (seconds)
    pub rate_limit_window_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG`
    pub level: String,
    /// JSON output
    pub structured: bool,
    /// When set, logs are also written to a daily rolling file here
    pub log_dir: Option<PathBuf>,
}

/// Chat completion provider (OpenAI or Perplexity)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatProviderConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Max tokens per answer
    pub max_tokens: u32,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend: "openai" or "hashing"
    pub backend: String,
    /// Model name for the OpenAI backend
    pub model_name: String,
    /// Vector dimension
    pub dimension: usize,
    /// Batch size for bulk encoding
    pub batch_size: usize,
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Maximum characters per stored chunk
    pub max_chunk_chars: usize,
    /// Default number of chunks fed to the model
    pub default_top_k: usize,
}

/// Stripe configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StripeConfig {
    /// API base URL
    pub base_url: String,
    /// Secret key
    pub secret_key: String,
    /// Redirect after success
    pub success_url: String,
    /// Redirect after cancel
    pub cancel_url: String,
}

/// Handoff worker configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HandoffConfig {
    /// Polling interval of the background worker (seconds, 0 disables it)
    pub poll_interval_secs: u64,
    /// Jobs processed per tick
    pub batch_size: usize,
    /// Timeout of a single dispatched call (seconds)
    pub dispatch_timeout_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub openai: ChatProviderConfig,
    pub perplexity: ChatProviderConfig,
    pub embedding: EmbeddingConfig,
    pub knowledge: KnowledgeConfig,
    pub stripe: StripeConfig,
    pub handoff: HandoffConfig,
    /// Application name
    pub app_name: String,
    /// Environment name
    pub environment: String,
}

impl AppConfig {
    /// Development configuration
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                backend: "memory".into(),
                url: "mem://".into(),
                namespace: "pharmaconnect".into(),
                database: "main".into(),
                username: "root".into(),
                password: "root".into(),
            },
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                max_request_size: 10 * 1024 * 1024,
                functions_base_url: "http://localhost:8080/functions/v1".into(),
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-in-production-min-32-chars".into(),
                jwt_audience: "authenticated".into(),
                service_token_ttl: 300,
                rate_limit_enabled: true,
                rate_limit_max_calls: 20,
                rate_limit_window_secs: 300,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            openai: ChatProviderConfig {
                base_url: "https://api.openai.com/v1".into(),
                api_key: String::new(),
                model: "gpt-4o-mini".into(),
                temperature: 0.7,
                max_tokens: 1500,
                timeout_secs: 60,
            },
            perplexity: ChatProviderConfig {
                base_url: "https://api.perplexity.ai".into(),
                api_key: String::new(),
                model: "llama-3.1-sonar-small-128k-online".into(),
                temperature: 0.2,
                max_tokens: 2000,
                timeout_secs: 60,
            },
            embedding: EmbeddingConfig {
                backend: "hashing".into(),
                model_name: "text-embedding-3-small".into(),
                dimension: 256,
                batch_size: 32,
            },
            knowledge: KnowledgeConfig {
                max_chunk_chars: 1500,
                default_top_k: 5,
            },
            stripe: StripeConfig {
                base_url: "https://api.stripe.com".into(),
                secret_key: String::new(),
                success_url: "http://localhost:5173/checkout/success".into(),
                cancel_url: "http://localhost:5173/checkout/cancel".into(),
            },
            handoff: HandoffConfig {
                poll_interval_secs: 0,
                batch_size: 5,
                dispatch_timeout_secs: 120,
            },
            app_name: "pharmaconnect".into(),
            environment: "development".into(),
        }
    }

    /// Production configuration
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.database.backend = "surrealdb".into();
        config.database.url = "http://localhost:8000".into();
        config.embedding.backend = "openai".into();
        config.embedding.dimension = 1536;
        config.handoff.poll_interval_secs = 10;
        config
    }
}
