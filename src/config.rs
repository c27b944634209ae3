//! TOML configuration.
//!
//! Every command reads one file (default `./config/course-ta.toml`).
//! Sections other than `[db]` are optional and fall back to the defaults
//! below. [`load_config`] validates the result before anything is built
//! from it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use course_ta_core::context::DEFAULT_ROLE;
use course_ta_core::normalize::MIN_LENGTH;
use course_ta_core::orchestrator::AnswerSettings;
use course_ta_core::retriever::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    /// JSON record files used by `course-ta index` when none are given.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Bodies shorter than this many characters (after normalization) are rejected.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            sources: Vec::new(),
            min_length: default_min_length(),
        }
    }
}

fn default_index_name() -> String {
    "tds_knowledge_base".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL (OpenAI-compatible `/v1` root, or the Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            url: None,
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    /// Completes "You are ..." in the prompt preamble.
    #[serde(default = "default_role")]
    pub role: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: default_generation_model(),
            url: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_generation_timeout_secs(),
            role: default_role(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Bound on one index search.
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry a failed embedding or search call once.
    #[serde(default = "default_true")]
    pub retry_reads: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            timeout_secs: default_retrieval_timeout_secs(),
            retry_reads: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_min_length() -> usize {
    MIN_LENGTH
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    400
}
fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// All-defaults configuration with the given database path.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn answer_settings(&self) -> AnswerSettings {
        AnswerSettings {
            top_k: self.retrieval.top_k,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            role: self.generation.role.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.index.name.trim().is_empty() {
        anyhow::bail!("index.name must not be empty");
    }

    if config.index.min_length < 1 {
        anyhow::bail!("index.min_length must be >= 1");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.generation.max_tokens < 1 {
        anyhow::bail!("generation.max_tokens must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    match config.generation.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
