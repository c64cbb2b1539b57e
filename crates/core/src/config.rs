//! Configuration management for critiq.
//!
//! Configuration is merged from three layers, lowest precedence first:
//! config file (`.critiq/config.yaml`), environment variables (`CRITIQ_*`),
//! and command-line flags. Most runtime state lives under `.critiq/` in the
//! workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .critiq/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider (e.g., "ollama", "openai", "claude")
    pub provider: String,

    /// Default model identifier, used by the retrieval, summarization and
    /// verification roles
    pub model: String,

    /// Model identifier for the context critic role. Falls back to `model`
    /// when unset; the critic benefits from a cheaper, more deterministic
    /// model than the answering roles.
    pub critic_model: Option<String>,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider table from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval tuning
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAi {
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Claude {
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

/// Retrieval store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks fetched per question
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Minimum cosine similarity for a chunk to be returned
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Character window for indexing-time chunking
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between adjacent index chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_top_k() -> u32 {
    5
}

fn default_min_score() -> f32 {
    0.20
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    64
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    retrieval: Option<RetrievalConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            critic_model: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `CRITIQ_WORKSPACE`: Override workspace path
    /// - `CRITIQ_CONFIG`: Path to config file
    /// - `CRITIQ_PROVIDER`: LLM provider
    /// - `CRITIQ_MODEL`: Model identifier
    /// - `CRITIQ_CRITIC_MODEL`: Model identifier for the context critic
    /// - `CRITIQ_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CRITIQ_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CRITIQ_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".critiq/config.yaml")
        };

        if config_path.exists() {
            tracing::debug!("Merging config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override the config file
        if let Ok(provider) = std::env::var("CRITIQ_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CRITIQ_MODEL") {
            config.model = model;
        }

        if let Ok(critic_model) = std::env::var("CRITIQ_CRITIC_MODEL") {
            config.critic_model = Some(critic_model);
        }

        config.api_key = std::env::var("CRITIQ_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            // The active provider's model becomes the default model
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_config {
                    ProviderConfig::OpenAi { model, .. } => model.clone(),
                    ProviderConfig::Claude { model, .. } => model.clone(),
                    ProviderConfig::Ollama { model, .. } => model.clone(),
                };
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config
    /// file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Model used by the context critic role.
    pub fn critic_model(&self) -> &str {
        self.critic_model.as_deref().unwrap_or(&self.model)
    }

    /// Get the path to the .critiq directory.
    pub fn critiq_dir(&self) -> PathBuf {
        self.workspace.join(".critiq")
    }

    /// Path to the SQLite retrieval index.
    pub fn index_path(&self) -> PathBuf {
        self.critiq_dir().join("index.sqlite")
    }

    /// Ensure the .critiq directory exists.
    pub fn ensure_critiq_dir(&self) -> AppResult<()> {
        let dir = self.critiq_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .critiq directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration block for a provider, if the config file has one.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider from the environment.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Explicit CRITIQ_API_KEY wins
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider)? {
            ProviderConfig::OpenAi { api_key_env, .. } => api_key_env,
            ProviderConfig::Claude { api_key_env, .. } => api_key_env,
            ProviderConfig::Ollama { .. } => return None,
        };

        std::env::var(&env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["ollama", "openai", "claude"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if let Some(provider_config) = self.get_provider_config(provider) {
            match provider_config {
                ProviderConfig::OpenAi { api_key_env, .. }
                | ProviderConfig::Claude { api_key_env, .. } => {
                    if std::env::var(&api_key_env).is_err() {
                        return Err(AppError::Config(format!(
                            "API key not found in environment variable: {}",
                            api_key_env
                        )));
                    }
                }
                ProviderConfig::Ollama { .. } => {
                    // Ollama needs no credentials
                }
            }
        }

        Ok(())
    }
}
