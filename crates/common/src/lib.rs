//! ReportForge Common Library
//!
//! Shared code for the ReportForge pipeline:
//! - Research: query decomposition, web search, credibility ranking, findings
//! - Analysis: themes, gap/overlap comparison, report outline
//! - Writing: rate-limited sections, citations, markdown and HTML assembly
//! - Document extraction with a content-hash cache
//! - Pipeline orchestration across the stages
//! - Error types, configuration and metrics

pub mod analysis;
pub mod cache;
pub mod config;
pub mod document;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod research;
pub mod search;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::LlmClient;
pub use pipeline::{PipelineOrchestrator, PipelineOutcome};
pub use search::WebSearchClient;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
