//! Shared initialization logic for the HTTP server and CLI commands.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{resolve_data_path, AppConfig};
use crate::db::connection::{init_db, load_db_config, ManuscryptDb};
use crate::db::schema::apply_schema;
use crate::llm::{AnthropicProvider, LlmProvider, ModelNames, ModelTier};
use crate::ratelimit::RateLimiter;
use crate::repository::{MessageLog, SurrealContextRepository, SurrealMessageLog};
use crate::services::{ContextAssembler, PromptCompiler};
use crate::ManuscryptError;

/// Application context holding storage, services and the model provider.
///
/// Shared between the HTTP server and CLI commands.
pub struct AppContext {
    pub db: Arc<ManuscryptDb>,
    pub data_path: PathBuf,
    pub config: AppConfig,
    /// `None` until an API key is configured.
    pub provider: Option<Arc<dyn LlmProvider>>,
    pub models: ModelNames,
    pub assembler: Arc<ContextAssembler>,
    pub compiler: PromptCompiler,
    pub message_log: Arc<dyn MessageLog>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > MANUSCRYPT_DATA_PATH env >
    /// ./.manuscrypt (if exists) > ~/.manuscrypt
    pub async fn new(explicit_path: Option<PathBuf>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());
        std::fs::create_dir_all(&data_path)?;

        let config = AppConfig::load(&data_path)?;
        let db_config = load_db_config(&data_path);
        let db = init_db(&db_config, &data_path).await?;
        tracing::info!("Database connected");

        let provider: Option<Arc<dyn LlmProvider>> = match config.anthropic.api_key.as_deref() {
            Some(key) if config.has_api_key() => Some(Arc::new(AnthropicProvider::new(
                key,
                config.anthropic.base_url.clone(),
            ))),
            _ => {
                tracing::warn!("ANTHROPIC_API_KEY not configured; assistant endpoints will fail");
                None
            }
        };

        Ok(Self::from_parts(db, data_path, config, provider).await?)
    }

    /// Assemble a context from an open connection. Applies the schema.
    pub async fn from_parts(
        db: ManuscryptDb,
        data_path: PathBuf,
        config: AppConfig,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self, ManuscryptError> {
        apply_schema(&db).await?;
        tracing::info!("Schema applied");

        let db = Arc::new(db);
        let assembler = Arc::new(ContextAssembler::new(Arc::new(
            SurrealContextRepository::new(db.clone()),
        )));
        let message_log: Arc<dyn MessageLog> = Arc::new(SurrealMessageLog::new(db.clone()));

        Ok(Self {
            models: config.anthropic.models(),
            compiler: PromptCompiler::new(config.prompt.continuation_window),
            db,
            data_path,
            config,
            provider,
            assembler,
            message_log,
            rate_limiter: Arc::new(RateLimiter::new()),
        })
    }

    /// The configured provider, or `ProviderUnavailable`.
    pub fn provider(&self) -> Result<Arc<dyn LlmProvider>, ManuscryptError> {
        self.provider.clone().ok_or_else(|| {
            ManuscryptError::ProviderUnavailable("ANTHROPIC_API_KEY not configured".to_string())
        })
    }

    pub fn model(&self, tier: ModelTier) -> String {
        self.models.resolve(tier).to_string()
    }
}
