//! Pipeline run state machine
//!
//! `Init -> Extracting -> Researching -> Analyzing -> Writing -> Done`, or
//! `Failed(stage)` from any non-terminal state.

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four externally visible stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extraction,
    Research,
    Analysis,
    Writing,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Extraction, Stage::Research, Stage::Analysis, Stage::Writing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Research => "research",
            Stage::Analysis => "analysis",
            Stage::Writing => "writing",
        }
    }

    /// 1-based position among the four stages
    pub fn step(&self) -> usize {
        match self {
            Stage::Extraction => 1,
            Stage::Research => 2,
            Stage::Analysis => 3,
            Stage::Writing => 4,
        }
    }

    /// State entered when this stage starts
    pub fn state(&self) -> PipelineState {
        match self {
            Stage::Extraction => PipelineState::Extracting,
            Stage::Research => PipelineState::Researching,
            Stage::Analysis => PipelineState::Analyzing,
            Stage::Writing => PipelineState::Writing,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Extracting,
    Researching,
    Analyzing,
    Writing,
    Done,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Init => Some(PipelineState::Extracting),
            PipelineState::Extracting => Some(PipelineState::Researching),
            PipelineState::Researching => Some(PipelineState::Analyzing),
            PipelineState::Analyzing => Some(PipelineState::Writing),
            PipelineState::Writing => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed(_) => None,
        }
    }
}

/// Progress notification sent while a run advances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    pub step: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn starting(stage: Stage) -> Self {
        let message = match stage {
            Stage::Extraction => "Processing document...",
            Stage::Research => "Researching topic...",
            Stage::Analysis => "Analyzing content...",
            Stage::Writing => "Writing report...",
        };
        Self {
            stage,
            message: message.to_string(),
            step: stage.step(),
            total: Stage::ALL.len(),
        }
    }
}

/// One pipeline execution and the states it passed through
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub topic: String,
    pub started_at: DateTime<Utc>,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl PipelineRun {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            started_at: Utc::now(),
            state: PipelineState::Init,
            history: vec![PipelineState::Init],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, oldest first
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to the next state in sequence
    pub fn advance(&mut self, to: PipelineState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(AppError::Internal {
                message: format!("Illegal pipeline transition {:?} -> {:?}", self.state, to),
            });
        }
        self.enter(to);
        Ok(())
    }

    /// Mark the run failed at `stage`; terminal runs are left untouched
    pub fn fail(&mut self, stage: Stage) {
        if !self.state.is_terminal() {
            self.enter(PipelineState::Failed(stage));
        }
    }

    fn enter(&mut self, state: PipelineState) {
        self.state = state;
        self.history.push(state);
    }
}
