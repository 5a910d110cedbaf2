//! Pipeline Orchestrator - runs extraction, research, analysis and writing in sequence

use super::stages::Stages;
use super::state::{PipelineRun, PipelineState, ProgressEvent, Stage};
use crate::config::PipelineConfig;
use crate::document::DocumentExtractor;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::writer::Report;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub text_length: usize,
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub sources_found: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub gaps: Vec<String>,
    pub overlaps: Vec<String>,
}

/// Everything a completed run hands back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub topic: String,
    pub document_analysis: DocumentSummary,
    pub research_summary: ResearchSummary,
    pub analysis: AnalysisSummary,
    pub report: Report,
}

pub struct PipelineOrchestrator {
    extractor: Arc<dyn DocumentExtractor>,
    stages: Stages,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, stages: Stages, config: PipelineConfig) -> Self {
        Self {
            extractor,
            stages,
            config,
        }
    }

    /// Run the whole pipeline for one upload
    pub async fn run(
        &self,
        file_bytes: &[u8],
        filename: &str,
        topic: &str,
        progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<PipelineOutcome> {
        let mut run = PipelineRun::new(topic);
        self.execute(&mut run, file_bytes, filename, progress).await
    }

    /// Run the pipeline, recording every state transition in `run`
    #[instrument(skip_all, fields(run_id = %run.id, topic = %run.topic, filename = %filename))]
    pub async fn execute(
        &self,
        run: &mut PipelineRun,
        file_bytes: &[u8],
        filename: &str,
        progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<PipelineOutcome> {
        let outcome = self.drive(run, file_bytes, filename, progress.as_ref()).await;

        match &outcome {
            Ok(_) => {
                run.advance(PipelineState::Done)?;
                metrics::record_pipeline_run("success");
                info!("Pipeline complete");
            }
            Err(e) => {
                metrics::record_pipeline_run("failed");
                error!(error = %e, state = ?run.state(), "Pipeline failed");
            }
        }
        outcome
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        file_bytes: &[u8],
        filename: &str,
        progress: Option<&mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<PipelineOutcome> {
        let topic = run.topic.clone();

        self.enter(run, Stage::Extraction, progress)?;
        let document_text = self.extract(file_bytes, filename).await;
        info!(chars = document_text.chars().count(), "Document extracted");

        self.enter(run, Stage::Research, progress)?;
        let research = self
            .stage(run, Stage::Research, self.config.research_timeout(), async {
                self.stages
                    .research
                    .research(&topic, self.config.max_sources)
                    .await
            })
            .await?;
        info!(sources = research.sources.len(), "Research complete");

        self.enter(run, Stage::Analysis, progress)?;
        let analysis = self
            .stage(run, Stage::Analysis, self.config.analysis_timeout(), async {
                self.stages
                    .analysis
                    .analyze(&topic, &document_text, &research)
                    .await
            })
            .await?;
        info!(sections = analysis.outline.sections.len(), "Analysis complete");

        self.enter(run, Stage::Writing, progress)?;
        let report = self
            .stage(run, Stage::Writing, self.config.writing_timeout(), async {
                self.stages
                    .writing
                    .write(&topic, &analysis.outline, &research, &document_text)
                    .await
            })
            .await?;
        info!(words = report.metadata.word_count, "Report complete");

        Ok(PipelineOutcome {
            topic,
            document_analysis: DocumentSummary {
                text_length: document_text.chars().count(),
                themes: analysis.document_themes,
            },
            research_summary: ResearchSummary {
                sources_found: research.sources.len(),
                confidence: research.confidence_score,
            },
            analysis: AnalysisSummary {
                gaps: analysis.gaps,
                overlaps: analysis.overlaps,
            },
            report,
        })
    }

    fn enter(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        progress: Option<&mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<()> {
        run.advance(stage.state())?;
        if let Some(tx) = progress {
            // Receiver may be gone; the run carries on regardless
            let _ = tx.send(ProgressEvent::starting(stage));
        }
        Ok(())
    }

    /// Extraction never fails the run: errors and empty text fall back to lossy decoding
    async fn extract(&self, file_bytes: &[u8], filename: &str) -> String {
        let started = Instant::now();
        let extracted = tokio::time::timeout(
            self.config.extraction_timeout(),
            self.extractor.extract(filename, file_bytes),
        )
        .await;

        let text = match extracted {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                warn!("Extractor returned no text, decoding raw bytes");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Extraction failed, decoding raw bytes");
                None
            }
            Err(_) => {
                warn!("Extraction timed out, decoding raw bytes");
                None
            }
        };

        metrics::record_stage(
            Stage::Extraction.as_str(),
            started.elapsed().as_secs_f64(),
            text.is_some(),
        );
        text.unwrap_or_else(|| String::from_utf8_lossy(file_bytes).into_owned())
    }

    /// Await one stage under its timeout; any failure marks the run failed
    async fn stage<T, F>(&self, run: &mut PipelineRun, stage: Stage, timeout: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::stage(stage.as_str(), e)),
            Err(_) => Err(AppError::stage(
                stage.as_str(),
                format!("timed out after {}s", timeout.as_secs()),
            )),
        };

        metrics::record_stage(stage.as_str(), started.elapsed().as_secs_f64(), result.is_ok());
        if result.is_err() {
            run.fail(stage);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResult, Outline};
    use crate::document::LocalDocumentExtractor;
    use crate::llm::MockLlmClient;
    use crate::pipeline::stages::{AnalysisStage, ResearchStage, WritingStage};
    use crate::research::ResearchResult;
    use crate::search::MockSearchClient;
    use async_trait::async_trait;

    struct SlowResearch;

    #[async_trait]
    impl ResearchStage for SlowResearch {
        async fn research(&self, _topic: &str, _max_sources: usize) -> Result<ResearchResult> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ResearchResult::default())
        }
    }

    struct FixedAnalysis;

    #[async_trait]
    impl AnalysisStage for FixedAnalysis {
        async fn analyze(&self, topic: &str, _doc: &str, _research: &ResearchResult) -> Result<AnalysisResult> {
            Ok(AnalysisResult {
                topic: topic.to_string(),
                outline: Outline::fallback_for(topic),
                ..AnalysisResult::default()
            })
        }
    }

    struct EchoWriter;

    #[async_trait]
    impl WritingStage for EchoWriter {
        async fn write(&self, topic: &str, outline: &Outline, _r: &ResearchResult, doc: &str) -> Result<Report> {
            Ok(Report {
                topic: topic.to_string(),
                markdown: doc.to_string(),
                sections: outline.sections.iter().map(|s| s.title.clone()).collect(),
                ..Report::default()
            })
        }
    }

    fn offline_stages() -> Stages {
        let llm = Arc::new(MockLlmClient::failing("offline"));
        let search = Arc::new(MockSearchClient::new());
        let local = Stages::local(llm, search, &PipelineConfig::default());
        Stages::new(local.research, Arc::new(FixedAnalysis), Arc::new(EchoWriter))
    }

    #[tokio::test]
    async fn test_unsupported_file_falls_back_to_raw_text() {
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(LocalDocumentExtractor),
            offline_stages(),
            PipelineConfig::default(),
        );

        let outcome = orchestrator
            .run(b"raw notes \xff here", "notes.bin", "rollups", None)
            .await
            .unwrap();

        assert_eq!(outcome.report.markdown, "raw notes \u{FFFD} here");
        assert_eq!(outcome.document_analysis.text_length, 16);
        assert_eq!(outcome.report.sections.len(), 4);
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(LocalDocumentExtractor),
            offline_stages(),
            PipelineConfig::default(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut run = PipelineRun::new("rollups");
        orchestrator
            .execute(&mut run, b"text", "a.txt", Some(tx))
            .await
            .unwrap();

        let mut steps = Vec::new();
        while let Ok(event) = rx.try_recv() {
            steps.push((event.step, event.stage));
        }
        assert_eq!(
            steps,
            vec![
                (1, Stage::Extraction),
                (2, Stage::Research),
                (3, Stage::Analysis),
                (4, Stage::Writing)
            ]
        );
        assert_eq!(run.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_fail_run() {
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(LocalDocumentExtractor),
            offline_stages(),
            PipelineConfig::default(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert!(orchestrator.run(b"text", "a.txt", "rollups", Some(tx)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_is_stage_failure() {
        let stages = Stages::new(Arc::new(SlowResearch), Arc::new(FixedAnalysis), Arc::new(EchoWriter));
        let orchestrator =
            PipelineOrchestrator::new(Arc::new(LocalDocumentExtractor), stages, PipelineConfig::default());

        let mut run = PipelineRun::new("rollups");
        let err = orchestrator
            .execute(&mut run, b"text", "a.txt", None)
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some("research"));
        assert!(err.to_string().contains("timed out after 60s"));
        assert_eq!(run.state(), PipelineState::Failed(Stage::Research));
    }
}
