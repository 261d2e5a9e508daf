// Configuration Storage Service
// Handles config file read/write, version backup, env overrides and credential lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::services::analysis::{DramaConfig, FailurePolicy, SummaryConfig};
use crate::services::providers::{api_key_env_vars, parse_provider, EMOTION_DEFAULT_MODEL};

const CONFIG_DIR_NAME: &str = "biaslens";
const BACKUPS_TO_KEEP: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No usable config directory")]
    NoConfigDir,
    #[error("Missing credential for {provider}: set {hint}")]
    MissingCredential { provider: String, hint: String },
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Unknown generation provider: {0}")]
    UnknownProvider(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    pub generation: GenerationConfig,
    pub emotion: EmotionServiceConfig,
    pub pipeline: PipelineConfig,
    pub drama: DramaConfig,
    pub summary: SummaryConfig,
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// `name` or `name:model`, e.g. `gemini` or `openai:gpt-4o-mini`.
    pub provider: String,
    pub base_url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmotionServiceConfig {
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for EmotionServiceConfig {
    fn default() -> Self {
        Self {
            model: EMOTION_DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            request_timeout_secs: 60,
            failure_policy: FailurePolicy::MarkFailed,
        }
    }
}

impl AppConfig {
    /// Apply `BIASLENS_PROVIDER` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("BIASLENS_PROVIDER").filter(|p| !p.trim().is_empty()) {
            info!("[CONFIG] Provider overridden by env: {}", provider.trim());
            self.generation.provider = provider.trim().to_string();
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store rooted at `BIASLENS_CONFIG_DIR`, or the platform config dir.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::default_config_dir()
            .map(Self::new)
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        match std::env::var("BIASLENS_CONFIG_DIR") {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME)),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            debug!("[CONFIG] No config at {}, using defaults", self.config_file.display());
            return Ok(AppConfig::default());
        }
        let content = fs::read_to_string(&self.config_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration, backing up the previous file first.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;
        if self.config_file.exists() {
            self.create_backup()?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_TO_KEEP)
    }

    /// Remove old backups, keeping only the most recent `keep`
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // File names embed the timestamp, so name order is age order.
        entries.sort_by_key(|e| e.file_name());
        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

/// Keys for the selected generation provider and the emotion service.
#[derive(Clone)]
pub struct Credentials {
    pub generation_key: String,
    pub emotion_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("generation_key", &format!("<{} chars>", self.generation_key.len()))
            .field("emotion_token", &format!("<{} chars>", self.emotion_token.len()))
            .finish()
    }
}

impl Credentials {
    /// Resolve keys from the environment, then the config file's `apiKeys`.
    /// `.env` must already be loaded into the environment by the caller.
    pub fn resolve(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    fn resolve_with<F>(config: &AppConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = parse_provider(&config.generation.provider).name;
        let generation_key = find_key(config, &provider, &lookup)?;
        let emotion_token = find_key(config, "huggingface", &lookup)?;
        Ok(Self {
            generation_key,
            emotion_token,
        })
    }
}

fn find_key<F>(config: &AppConfig, provider: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env_vars = api_key_env_vars(provider);
    let from_env = env_vars
        .iter()
        .filter_map(|var| lookup(var))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty());
    if let Some(key) = from_env {
        debug!("[CONFIG] {} key found in environment", provider);
        return Ok(key);
    }

    let from_file = config
        .api_keys
        .get(provider)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if let Some(key) = from_file {
        debug!("[CONFIG] {} key found in config file", provider);
        return Ok(key);
    }

    let hint = if env_vars.is_empty() {
        format!("apiKeys.{} in config.json", provider)
    } else {
        format!("{} or apiKeys.{} in config.json", env_vars[0], provider)
    };
    Err(ConfigError::MissingCredential {
        provider: provider.to_string(),
        hint,
    })
}
