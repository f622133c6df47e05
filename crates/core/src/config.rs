use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Dimensions accepted by the alternate (NIM-style REST) embedding endpoint.
pub const ALTERNATE_ALLOWED_DIMS: &[usize] = &[384, 512, 768, 1024, 2048];

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var. A value that is present but unparsable is an
/// error, never a silent fallback to the default.
fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> Result<T, ConfigError> {
    match profiled_env_opt(profile, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
    match profiled_env_opt(profile, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
    pub summary: SummaryConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub postgres: PostgresConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCLOAD_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("DOCLOAD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let config = Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p)?,
            summary: SummaryConfig::from_env_profiled(p)?,
            embedding: EmbeddingConfig::from_env_profiled(p)?,
            llm: LlmConfig::from_env_profiled(p)?,
            ollama: OllamaConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints. Called by the constructors and again by
    /// callers that patch fields (e.g. CLI overrides).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  chunking:    size={} overlap={}",
            self.chunking.chunk_size,
            self.chunking.chunk_overlap
        );
        tracing::info!(
            "  summary:     enabled={} window={} delay_ms={}",
            self.summary.enabled,
            self.summary.window_half_width,
            self.summary.delay_ms
        );
        tracing::info!(
            "  embedding:   model={} dims={} batch={}",
            self.embedding.model,
            self.embedding.dimensions,
            self.embedding.batch_size()
        );
        tracing::info!("  llm:         provider={}", self.llm.provider);
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 100,
        }
    }
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            chunk_size: profiled_env_parse(p, "CHUNK_SIZE", d.chunk_size)?,
            chunk_overlap: profiled_env_parse(p, "CHUNK_OVERLAP", d.chunk_overlap)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }
}

// ── Summaries ─────────────────────────────────────────────────

/// What to do with a chunk whose summary could not be produced after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFailurePolicy {
    /// Fail the whole document.
    #[default]
    Fail,
    /// Keep the chunk, write the header without a summary line and log a warning.
    Omit,
}

impl FromStr for SummaryFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "omit" => Ok(Self::Omit),
            other => Err(ConfigError::InvalidValue {
                key: "SUMMARY_FAILURE_POLICY".into(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// Units on each side of the target unit included in its summary window.
    pub window_half_width: usize,
    /// Fixed pause before every summarizer call.
    pub delay_ms: u64,
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub failure_policy: SummaryFailurePolicy,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_half_width: 2,
            delay_ms: 1000,
            timeout_secs: 60,
            max_retries: 2,
            failure_policy: SummaryFailurePolicy::Fail,
        }
    }
}

impl SummaryConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let d = Self::default();
        let failure_policy = match profiled_env_opt(p, "SUMMARY_FAILURE_POLICY") {
            Some(raw) => raw.parse()?,
            None => d.failure_policy,
        };
        Ok(Self {
            enabled: profiled_env_bool(p, "SUMMARY_ENABLED", d.enabled)?,
            window_half_width: profiled_env_parse(p, "SUMMARY_WINDOW_HALF_WIDTH", d.window_half_width)?,
            delay_ms: profiled_env_parse(p, "SUMMARY_DELAY_MS", d.delay_ms)?,
            timeout_secs: profiled_env_parse(p, "SUMMARY_TIMEOUT_SECS", d.timeout_secs)?,
            max_retries: profiled_env_parse(p, "SUMMARY_MAX_RETRIES", d.max_retries)?,
            failure_policy,
        })
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingModel {
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    #[default]
    Primary,
    /// NIM-style REST endpoint with a restricted set of output dimensions.
    Alternate,
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Alternate => f.write_str("alternate"),
        }
    }
}

impl FromStr for EmbeddingModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "alternate" => Ok(Self::Alternate),
            other => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_MODEL".into(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: EmbeddingModel,
    pub dimensions: usize,
    /// Overrides the per-model default batch size.
    pub batch_size_override: Option<usize>,
    pub timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub rest_url: String,
    pub rest_model: String,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let model = match profiled_env_opt(p, "EMBEDDING_MODEL") {
            Some(raw) => raw.parse()?,
            None => EmbeddingModel::default(),
        };
        let batch_size_override = match profiled_env_opt(p, "EMBEDDING_BATCH_SIZE") {
            Some(_) => Some(profiled_env_parse(p, "EMBEDDING_BATCH_SIZE", 0usize)?),
            None => None,
        };
        Ok(Self {
            model,
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 1024usize)?,
            batch_size_override,
            timeout_secs: profiled_env_parse(p, "EMBEDDING_TIMEOUT_SECS", 30u64)?,
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_base_url: profiled_env_or(p, "EMBEDDING_BASE_URL", "https://api.openai.com"),
            openai_model: profiled_env_or(p, "EMBEDDING_OPENAI_MODEL", "text-embedding-3-small"),
            rest_url: profiled_env_or(p, "EMBEDDING_REST_URL", "http://localhost:8000/v1/embeddings"),
            rest_model: profiled_env_or(p, "EMBEDDING_REST_MODEL", "nvidia/llama-3.2-nv-embedqa-1b-v2"),
        })
    }

    /// Texts per embedding request: explicit override, else 96 for the primary
    /// endpoint and 10 for the alternate one.
    pub fn batch_size(&self) -> usize {
        self.batch_size_override.unwrap_or(match self.model {
            EmbeddingModel::Primary => 96,
            EmbeddingModel::Alternate => 10,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size() == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.model == EmbeddingModel::Alternate
            && !ALTERNATE_ALLOWED_DIMS.contains(&self.dimensions)
        {
            return Err(ConfigError::InvalidDimensions {
                dimensions: self.dimensions,
                allowed: ALTERNATE_ALLOWED_DIMS,
            });
        }
        Ok(())
    }
}

// ── LLM (summaries) ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "ollama"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.1f32)?,
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 1024u32)?,
        })
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parse(p, "PG_PORT", 5432u16)?,
            database: profiled_env_or(p, "PG_DATABASE", "docload"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parse(p, "PG_MAX_CONNECTIONS", 5u32)?,
        })
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }
}
