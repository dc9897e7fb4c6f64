use std::sync::Arc;
use std::time::Duration;

use crate::config::config::AppConfig;
use crate::error::Result;
use crate::index::{EmbeddingModel, create_embedding_model};
use crate::llm::{ChatCompletionClient, ChatModel};
use crate::observability::ObservabilityState;
use crate::security::auth::JwtAuth;
use crate::security::rate_limit::RateLimiter;
use crate::services::{
    AssistantService, CheckoutClient, Dispatcher, HandoffService, HttpDispatcher, KnowledgeService,
    Notifier, RegulatoryService,
};
use crate::storage::factory::Tables;
use crate::websocket::{NotificationHub, SignalingHub};

/// Upstream clients the services are built on
pub struct Upstreams {
    /// General chat model (OpenAI)
    pub chat: Arc<dyn ChatModel>,
    /// Search-backed chat model (Perplexity)
    pub search: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn EmbeddingModel>,
    /// How handoff jobs reach their target function
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl Upstreams {
    /// Real HTTP clients from configuration
    pub fn from_config(config: &AppConfig, auth: Arc<JwtAuth>) -> Result<Self> {
        let dispatcher = HttpDispatcher::new(
            &config.server.functions_base_url,
            auth,
            Duration::from_secs(config.handoff.dispatch_timeout_secs.max(1)),
        )?;
        Ok(Self {
            chat: Arc::new(ChatCompletionClient::openai(&config.openai)?),
            search: Arc::new(ChatCompletionClient::perplexity(&config.perplexity)?),
            embedder: Arc::from(create_embedding_model(&config.embedding, &config.openai)?),
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// Application state containing all shared services and security components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Table repositories
    pub tables: Tables,
    /// Token issuer / verifier
    pub auth: Arc<JwtAuth>,
    /// Per-user, per-function call limiter
    pub rate_limiter: Arc<RateLimiter>,
    pub assistant: Arc<AssistantService>,
    pub knowledge: Arc<KnowledgeService>,
    pub handoff: Arc<HandoffService>,
    pub regulatory: Arc<RegulatoryService>,
    pub checkout: Arc<CheckoutClient>,
    pub notifier: Notifier,
    pub signaling: SignalingHub,
    pub observability: Arc<ObservabilityState>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.config.environment)
            .field("storage", &self.config.database.backend)
            .field("auth", &self.auth)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire every service from configuration, tables and upstream clients
    pub fn new(config: AppConfig, tables: Tables, auth: Arc<JwtAuth>, upstreams: Upstreams) -> Result<Self> {
        let notifier = Notifier::new(tables.notifications.clone(), NotificationHub::default());

        let handoff = Arc::new(
            HandoffService::new(
                tables.handoff_jobs.clone(),
                upstreams.dispatcher,
                config.handoff.batch_size,
            )
            .with_notifier(notifier.clone()),
        );

        let assistant = Arc::new(AssistantService::new(
            upstreams.chat.clone(),
            tables.agent_outputs.clone(),
            handoff.clone(),
        ));
        let knowledge = Arc::new(KnowledgeService::new(
            &tables,
            upstreams.embedder,
            upstreams.chat,
            &config.knowledge,
            &config.embedding,
        ));
        let regulatory = Arc::new(RegulatoryService::new(
            upstreams.search,
            tables.regulatory_alerts.clone(),
            tables.agent_outputs.clone(),
        ));
        let checkout = Arc::new(CheckoutClient::new(config.stripe.clone())?);
        let rate_limiter = Arc::new(RateLimiter::from_settings(
            &config.security,
            tables.function_invocations.clone(),
        ));
        let observability = Arc::new(ObservabilityState::new(env!("CARGO_PKG_VERSION"))?);

        Ok(Self {
            config: Arc::new(config),
            tables,
            auth,
            rate_limiter,
            assistant,
            knowledge,
            handoff,
            regulatory,
            checkout,
            notifier,
            signaling: SignalingHub::new(),
            observability,
        })
    }

    /// State backed by real upstream clients
    pub fn from_config(config: AppConfig, tables: Tables) -> Result<Self> {
        let auth = Arc::new(JwtAuth::from_config(&config.security));
        let upstreams = Upstreams::from_config(&config, auth.clone())?;
        Self::new(config, tables, auth, upstreams)
    }

    /// Development state: in-memory tables and development settings
    pub fn development() -> Result<Self> {
        Self::from_config(AppConfig::development(), Tables::in_memory())
    }
}
