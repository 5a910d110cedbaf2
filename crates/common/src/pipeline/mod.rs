//! Pipeline orchestration
//!
//! Chains document extraction, research, analysis and writing. Stages sit
//! behind traits so a run can use in-process engines or remote gateways.

mod orchestrator;
mod remote;
mod stages;
mod state;
mod title;

pub use orchestrator::{
    AnalysisSummary, DocumentSummary, PipelineOrchestrator, PipelineOutcome, ResearchSummary,
};
pub use remote::RemoteStages;
pub use stages::{AnalysisStage, ResearchStage, Stages, WritingStage};
pub use state::{PipelineRun, PipelineState, ProgressEvent, Stage};
pub use title::{generate_filename, generate_title};
