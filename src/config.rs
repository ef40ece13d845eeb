//! Application configuration.
//!
//! Priority, highest first: environment variables, `{data_path}/manuscrypt.toml`,
//! built-in defaults. Storage settings live separately in `database.toml`
//! (see [`crate::db::connection::load_db_config`]).

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::ModelNames;
use crate::ratelimit::RatePolicy;
use crate::ManuscryptError;

pub const CONFIG_FILE: &str = "manuscrypt.toml";
const DATA_DIR: &str = ".manuscrypt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub anthropic: AnthropicConfig,
    pub rate_limit: RateLimitConfig,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model for chat and continuation.
    pub fast_model: String,
    /// Model for interviews, reviews and style analysis.
    pub smart_model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub sweep_interval_secs: u64,
    pub retention_secs: u64,
    /// Peer whose `X-Forwarded-For` header is honoured. Unset: never.
    pub trusted_proxy: Option<IpAddr>,
    /// Per-endpoint overrides, keyed by scope (`stream`, `interview`,
    /// `review`, `style-analyze`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, EndpointLimit>,
}

/// Either field left unset falls back to the shared `[rate_limit]` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointLimit {
    pub max_requests: Option<usize>,
    pub window_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub continuation_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            anthropic: AnthropicConfig::default(),
            rate_limit: RateLimitConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com/v1".to_string(),
            fast_model: "claude-haiku-4-5-20251001".to_string(),
            smart_model: "claude-sonnet-4-6".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: crate::ratelimit::DEFAULT_MAX_REQUESTS,
            window_secs: crate::ratelimit::DEFAULT_WINDOW.as_secs(),
            sweep_interval_secs: 300,
            retention_secs: 120,
            trusted_proxy: None,
            endpoints: BTreeMap::new(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            continuation_window: crate::services::prompt::DEFAULT_CONTINUATION_WINDOW,
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RatePolicy {
        RatePolicy {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }

    /// Policy for one endpoint scope, with its override applied.
    pub fn policy_for(&self, scope: &str) -> RatePolicy {
        let Some(limit) = self.endpoints.get(scope) else {
            return self.policy();
        };
        RatePolicy {
            max_requests: limit.max_requests.unwrap_or(self.max_requests),
            window: Duration::from_secs(limit.window_secs.unwrap_or(self.window_secs)),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl AnthropicConfig {
    pub fn models(&self) -> ModelNames {
        ModelNames {
            fast: self.fast_model.clone(),
            smart: self.smart_model.clone(),
        }
    }
}

impl AppConfig {
    /// Load from `{data_path}/manuscrypt.toml` and the process environment.
    pub fn load(data_path: &Path) -> Result<Self, ManuscryptError> {
        let mut config = Self::from_file(&data_path.join(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file; a missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, ManuscryptError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| ManuscryptError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ManuscryptError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("MANUSCRYPT_ANTHROPIC_API_KEY").or_else(|| var("ANTHROPIC_API_KEY")) {
            self.anthropic.api_key = Some(key);
        }
        if let Some(bind) = var("MANUSCRYPT_BIND") {
            self.bind = bind
                .parse()
                .map_err(|e| ManuscryptError::Config(format!("MANUSCRYPT_BIND '{bind}': {e}")))?;
        }
        if let Some(model) = var("MANUSCRYPT_FAST_MODEL") {
            self.anthropic.fast_model = model;
        }
        if let Some(model) = var("MANUSCRYPT_SMART_MODEL") {
            self.anthropic.smart_model = model;
        }
        if let Some(proxy) = var("MANUSCRYPT_TRUSTED_PROXY") {
            self.rate_limit.trusted_proxy = Some(proxy.parse().map_err(|e| {
                ManuscryptError::Config(format!("MANUSCRYPT_TRUSTED_PROXY '{proxy}': {e}"))
            })?);
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.anthropic
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Data path priority: explicit path > `MANUSCRYPT_DATA_PATH` env >
/// `./.manuscrypt` (if it exists) > `~/.manuscrypt`.
pub fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var("MANUSCRYPT_DATA_PATH").ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(DATA_DIR);
            if local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(DATA_DIR))
                .unwrap_or_else(|| PathBuf::from(DATA_DIR))
        })
}
