//! Configuration management for ReportForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! Credentials may also come from the conventional `GROQ_API_KEY` and
//! `SERPAPI_KEY` variables. Missing credentials never fail loading; the
//! affected component reports itself as not configured instead.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search backend configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Uploaded document cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum upload size in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (falls back to GROQ_API_KEY)
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Total time budget for retries in milliseconds
    #[serde(default = "default_llm_retry_budget")]
    pub retry_budget_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// SerpAPI endpoint
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// API key (falls back to SERPAPI_KEY)
    pub api_key: Option<String>,

    /// Search engine name passed to the provider
    #[serde(default = "default_search_engine")]
    pub engine: String,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

/// Where pipeline stages execute
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
    /// Engines run inside this process
    #[default]
    Local,
    /// Stages are reached over HTTP at the configured URLs
    Remote,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: StageMode,

    /// Base URLs of remote stage services (used in remote mode)
    pub research_url: Option<String>,
    pub analyzer_url: Option<String>,
    pub writer_url: Option<String>,

    /// Sources kept after ranking
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Sub-queries generated per topic
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Search results requested per sub-query
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Themes extracted per text
    #[serde(default = "default_max_themes")]
    pub max_themes: usize,

    /// Minimum delay between section generation calls in milliseconds
    #[serde(default = "default_section_delay")]
    pub section_min_delay_ms: u64,

    /// Target words per generated section
    #[serde(default = "default_section_words")]
    pub section_word_target: usize,

    /// Caller-side stage timeouts in seconds
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,
    #[serde(default = "default_research_timeout")]
    pub research_timeout_secs: u64,
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,
    #[serde(default = "default_writing_timeout")]
    pub writing_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Enable the uploaded-document cache
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (whole gateway)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 4000 }
fn default_max_upload() -> usize { 10 * 1024 * 1024 }
fn default_llm_endpoint() -> String { "https://api.groq.com/openai/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "llama-3.1-8b-instant".to_string() }
fn default_llm_timeout() -> u64 { 30 }
fn default_llm_retry_budget() -> u64 { 10_000 }
fn default_search_endpoint() -> String { "https://serpapi.com/search.json".to_string() }
fn default_search_engine() -> String { "google".to_string() }
fn default_results_per_query() -> usize { 10 }
fn default_search_timeout() -> u64 { 20 }
fn default_max_sources() -> usize { 10 }
fn default_max_queries() -> usize { 3 }
fn default_max_themes() -> usize { 5 }
fn default_section_delay() -> u64 { 5_000 }
fn default_section_words() -> usize { 250 }
fn default_extraction_timeout() -> u64 { 30 }
fn default_research_timeout() -> u64 { 60 }
fn default_analysis_timeout() -> u64 { 60 }
fn default_writing_timeout() -> u64 { 120 }
fn default_cache_ttl() -> u64 { 3600 }
fn default_key_prefix() -> String { "reportforge".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "reportforge".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            retry_budget_ms: default_llm_retry_budget(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            engine: default_search_engine(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: StageMode::Local,
            research_url: None,
            analyzer_url: None,
            writer_url: None,
            max_sources: default_max_sources(),
            max_queries: default_max_queries(),
            results_per_query: default_results_per_query(),
            max_themes: default_max_themes(),
            section_min_delay_ms: default_section_delay(),
            section_word_target: default_section_words(),
            extraction_timeout_secs: default_extraction_timeout(),
            research_timeout_secs: default_research_timeout(),
            analysis_timeout_secs: default_analysis_timeout(),
            writing_timeout_secs: default_writing_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_cache_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        Ok(config.with_conventional_keys(|name| std::env::var(name).ok()))
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Fill missing credentials from conventional variable names
    pub fn with_conventional_keys<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            self.llm.api_key = lookup("GROQ_API_KEY").filter(|k| !k.is_empty());
        }
        if self.search.api_key.as_deref().map_or(true, str::is_empty) {
            self.search.api_key = lookup("SERPAPI_KEY").filter(|k| !k.is_empty());
        }
        self
    }

    /// Minimum delay between section generation calls
    pub fn section_min_delay(&self) -> Duration {
        Duration::from_millis(self.pipeline.section_min_delay_ms)
    }

    /// Cache entry lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

impl PipelineConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn research_timeout(&self) -> Duration {
        Duration::from_secs(self.research_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn writing_timeout(&self) -> Duration {
        Duration::from_secs(self.writing_timeout_secs)
    }
}
