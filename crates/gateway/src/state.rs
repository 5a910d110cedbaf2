//! Shared handler state
//!
//! Each engine is optional: a component whose credentials are missing stays
//! `None` and its endpoints answer "not configured".

use reportforge_common::{
    config::{AppConfig, StageMode},
    document::DocumentProcessor,
    llm::{ChatCompletionsClient, LlmClient},
    pipeline::{AnalysisStage, PipelineOrchestrator, ResearchStage, Stages, WritingStage},
    search::{SerpApiClient, WebSearchClient},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub research: Option<Arc<dyn ResearchStage>>,
    pub analysis: Option<Arc<dyn AnalysisStage>>,
    pub writing: Option<Arc<dyn WritingStage>>,
    pub pipeline: Option<Arc<PipelineOrchestrator>>,
}

impl AppState {
    /// Build real clients from configuration
    pub fn from_config(config: AppConfig) -> Self {
        let llm = match ChatCompletionsClient::new(&config.llm) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn LlmClient>),
            Err(e) => {
                warn!(error = %e, "LLM client unavailable");
                None
            }
        };
        let search = match SerpApiClient::new(&config.search) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn WebSearchClient>),
            Err(e) => {
                warn!(error = %e, "Search client unavailable");
                None
            }
        };

        Self::with_clients(config, llm, search)
    }

    /// Build state around the given clients
    pub fn with_clients(
        config: AppConfig,
        llm: Option<Arc<dyn LlmClient>>,
        search: Option<Arc<dyn WebSearchClient>>,
    ) -> Self {
        let pipeline_config = &config.pipeline;

        let research: Option<Arc<dyn ResearchStage>> = match (&llm, &search) {
            (Some(llm), Some(search)) => Some(Arc::new(Stages::research_engine(
                llm.clone(),
                search.clone(),
                pipeline_config,
            ))),
            _ => None,
        };
        let analysis: Option<Arc<dyn AnalysisStage>> = llm
            .as_ref()
            .map(|llm| Arc::new(Stages::analysis_engine(llm.clone(), pipeline_config)) as _);
        // One writer for every request so section spacing holds across them
        let writing: Option<Arc<dyn WritingStage>> = llm
            .as_ref()
            .map(|llm| Arc::new(Stages::report_writer(llm.clone(), pipeline_config)) as _);

        let stages = match pipeline_config.mode {
            StageMode::Local => match (&research, &analysis, &writing) {
                (Some(r), Some(a), Some(w)) => Some(Stages::new(r.clone(), a.clone(), w.clone())),
                _ => None,
            },
            StageMode::Remote => match Stages::remote(pipeline_config) {
                Ok(stages) => Some(stages),
                Err(e) => {
                    warn!(error = %e, "Remote stages unavailable");
                    None
                }
            },
        };

        let pipeline = stages.map(|stages| {
            Arc::new(PipelineOrchestrator::new(
                Arc::new(DocumentProcessor::local(config.cache.clone())),
                stages,
                pipeline_config.clone(),
            ))
        });

        info!(
            research = research.is_some(),
            analysis = analysis.is_some(),
            writing = writing.is_some(),
            pipeline = pipeline.is_some(),
            mode = ?pipeline_config.mode,
            "Engines initialized"
        );

        Self {
            config: Arc::new(config),
            research,
            analysis,
            writing,
            pipeline,
        }
    }
}
