//! Stage seams and their in-process implementations

use crate::analysis::{AnalysisEngine, AnalysisResult, Outline};
use crate::config::{PipelineConfig, StageMode};
use crate::errors::Result;
use crate::llm::LlmClient;
use crate::research::{ResearchEngine, ResearchOptions, ResearchResult};
use crate::search::WebSearchClient;
use crate::writer::{Report, ReportWriter, SectionGenerator, TokioClock};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::remote::RemoteStages;

#[async_trait]
pub trait ResearchStage: Send + Sync {
    async fn research(&self, topic: &str, max_sources: usize) -> Result<ResearchResult>;
}

#[async_trait]
pub trait AnalysisStage: Send + Sync {
    async fn analyze(
        &self,
        topic: &str,
        document_text: &str,
        research: &ResearchResult,
    ) -> Result<AnalysisResult>;
}

#[async_trait]
pub trait WritingStage: Send + Sync {
    async fn write(
        &self,
        topic: &str,
        outline: &Outline,
        research: &ResearchResult,
        document_text: &str,
    ) -> Result<Report>;
}

#[async_trait]
impl ResearchStage for ResearchEngine {
    async fn research(&self, topic: &str, max_sources: usize) -> Result<ResearchResult> {
        Ok(ResearchEngine::research(self, topic, max_sources).await)
    }
}

#[async_trait]
impl AnalysisStage for AnalysisEngine {
    async fn analyze(
        &self,
        topic: &str,
        document_text: &str,
        research: &ResearchResult,
    ) -> Result<AnalysisResult> {
        Ok(AnalysisEngine::analyze(self, topic, document_text, research).await)
    }
}

#[async_trait]
impl WritingStage for ReportWriter {
    async fn write(
        &self,
        topic: &str,
        outline: &Outline,
        research: &ResearchResult,
        document_text: &str,
    ) -> Result<Report> {
        Ok(self.write_report(topic, outline, research, document_text).await)
    }
}

/// The three stages a pipeline run calls in order
#[derive(Clone)]
pub struct Stages {
    pub research: Arc<dyn ResearchStage>,
    pub analysis: Arc<dyn AnalysisStage>,
    pub writing: Arc<dyn WritingStage>,
}

impl Stages {
    pub fn new(
        research: Arc<dyn ResearchStage>,
        analysis: Arc<dyn AnalysisStage>,
        writing: Arc<dyn WritingStage>,
    ) -> Self {
        Self {
            research,
            analysis,
            writing,
        }
    }

    /// In-process engines sharing one LLM and one search client
    pub fn local(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn WebSearchClient>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            Arc::new(Self::research_engine(llm.clone(), search, config)),
            Arc::new(Self::analysis_engine(llm.clone(), config)),
            Arc::new(Self::report_writer(llm, config)),
        )
    }

    pub fn research_engine(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn WebSearchClient>,
        config: &PipelineConfig,
    ) -> ResearchEngine {
        ResearchEngine::new(llm, search).with_options(ResearchOptions {
            max_queries: config.max_queries,
            results_per_query: config.results_per_query,
        })
    }

    pub fn analysis_engine(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> AnalysisEngine {
        AnalysisEngine::new(llm).with_max_themes(config.max_themes)
    }

    /// Writer whose section generator spaces calls by `section_min_delay_ms`
    pub fn report_writer(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> ReportWriter {
        let sections = SectionGenerator::with_clock(
            llm.clone(),
            Arc::new(TokioClock),
            Duration::from_millis(config.section_min_delay_ms),
        );
        ReportWriter::new(llm)
            .with_section_generator(sections)
            .with_word_target(config.section_word_target)
    }

    /// Stages reached over HTTP at the configured URLs
    pub fn remote(config: &PipelineConfig) -> Result<Self> {
        let remote = Arc::new(RemoteStages::from_config(config)?);
        Ok(Self::new(remote.clone(), remote.clone(), remote))
    }

    /// Pick local or remote stages per `pipeline.mode`
    pub fn from_config(
        config: &PipelineConfig,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn WebSearchClient>,
    ) -> Result<Self> {
        match config.mode {
            StageMode::Local => Ok(Self::local(llm, search, config)),
            StageMode::Remote => Self::remote(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::search::{MockSearchClient, SearchResult};

    #[tokio::test]
    async fn test_results_per_query_reaches_search() {
        let config = PipelineConfig {
            results_per_query: 4,
            ..PipelineConfig::default()
        };
        let search = Arc::new(MockSearchClient::new().with_default(vec![
            SearchResult::new("https://a.com", "A", "a");
            6
        ]));
        let stages = Stages::local(Arc::new(MockLlmClient::failing("down")), search.clone(), &config);

        let result = stages.research.research("rollups", 10).await.unwrap();

        assert_eq!(search.limits(), vec![4]);
        assert_eq!(result.total_sources_analyzed, 4);
    }

    #[test]
    fn test_remote_mode_requires_urls() {
        let config = PipelineConfig {
            mode: StageMode::Remote,
            ..PipelineConfig::default()
        };
        let llm = Arc::new(MockLlmClient::new());
        let search = Arc::new(MockSearchClient::new());
        assert!(Stages::from_config(&config, llm, search).is_err());
    }
}
