//! Configuration for eventsonar.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVENTSONAR_HOME, EVENTSONAR_SOURCE_URL, LLM_*, SPEECH_*)
//! 2. Config file (.eventsonar/config.yaml)
//! 3. Defaults (~/.eventsonar, 24 hour TTL, OpenAI-compatible endpoint)
//!
//! Config file discovery:
//! - Searches current directory and parents for .eventsonar/config.yaml
//! - `paths.home` in the config file is relative to the .eventsonar/ directory

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::{chat, speech};
use crate::domain::DEFAULT_TTL_HOURS;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 120;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Store directory (relative to .eventsonar/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Event-listing page to scrape
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    pub ttl_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub voice_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths and defaults applied
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Absolute path to the store directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Event-listing page; listing operations need it
    pub source_url: Option<String>,
    /// Event list validity window
    pub ttl_hours: i64,
    pub llm: LlmSettings,
    pub speech: SpeechSettings,
    /// Timeout applied to every external HTTP call
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    #[serde(serialize_with = "mask_secret")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechSettings {
    pub endpoint: String,
    #[serde(serialize_with = "mask_secret")]
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub voice_id: String,
}

/// Secrets print as `"***"` (or null when unset)
fn mask_secret<S: serde::Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("***"),
        None => serializer.serialize_none(),
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".eventsonar").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge env, file and defaults. `env` looks up a variable by name.
fn resolve(
    config_path: Option<&Path>,
    file: ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let home = if let Some(env_home) = env("EVENTSONAR_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(config_path), Some(home_path)) = (config_path, file.paths.home.as_deref()) {
        let eventsonar_dir = config_path.parent().unwrap_or(Path::new("."));
        resolve_path(eventsonar_dir, home_path)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".eventsonar")
    };

    let ttl_hours = file.cache.ttl_hours.unwrap_or(DEFAULT_TTL_HOURS);
    if ttl_hours <= 0 {
        anyhow::bail!("cache.ttl_hours must be positive, got {}", ttl_hours);
    }

    Ok(ResolvedConfig {
        home,
        config_file: config_path.map(Path::to_path_buf),
        source_url: env("EVENTSONAR_SOURCE_URL").or(file.source.url),
        ttl_hours,
        llm: LlmSettings {
            endpoint: env("LLM_ENDPOINT")
                .or(file.llm.endpoint)
                .unwrap_or_else(|| chat::DEFAULT_ENDPOINT.to_string()),
            model: env("LLM_MODEL")
                .or(file.llm.model)
                .unwrap_or_else(|| chat::DEFAULT_MODEL.to_string()),
            api_key: env("LLM_API_KEY").or(file.llm.api_key),
        },
        speech: SpeechSettings {
            endpoint: env("SPEECH_ENDPOINT")
                .or(file.speech.endpoint)
                .unwrap_or_else(|| speech::DEFAULT_ENDPOINT.to_string()),
            api_key: env("SPEECH_API_KEY").or(file.speech.api_key),
            user_id: env("SPEECH_USER_ID").or(file.speech.user_id),
            voice_id: env("SPEECH_VOICE_ID")
                .or(file.speech.voice_id)
                .unwrap_or_else(|| speech::DEFAULT_VOICE_ID.to_string()),
        },
        http_timeout_seconds: file
            .http
            .timeout_seconds
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let file = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    resolve(config_file.as_deref(), file, |name| std::env::var(name).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
