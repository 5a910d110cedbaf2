//! Stages reached over HTTP
//!
//! Each stage is a JSON POST to another ReportForge gateway:
//! `/v2/research`, `/v2/analyze` and `/v2/write`.

use super::stages::{AnalysisStage, ResearchStage, WritingStage};
use crate::analysis::{AnalysisResult, Outline};
use crate::config::PipelineConfig;
use crate::errors::{AppError, Result};
use crate::research::ResearchResult;
use crate::writer::Report;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};

pub struct RemoteStages {
    client: reqwest::Client,
    research_url: String,
    analyzer_url: String,
    writer_url: String,
}

impl RemoteStages {
    pub fn new(
        research_url: impl Into<String>,
        analyzer_url: impl Into<String>,
        writer_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            research_url: trim_base(research_url.into()),
            analyzer_url: trim_base(analyzer_url.into()),
            writer_url: trim_base(writer_url.into()),
        })
    }

    /// Build from `pipeline.*_url`; every URL must be present
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let url = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: format!("pipeline.{} is required in remote mode", key),
                })
        };

        Self::new(
            url(&config.research_url, "research_url")?,
            url(&config.analyzer_url, "analyzer_url")?,
            url(&config.writer_url, "writer_url")?,
        )
    }

    async fn post<B, T>(&self, service: &'static str, url: String, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(service, url = %url, "Calling remote stage");
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(service, status = status.as_u16(), "Remote stage returned error");
            return Err(AppError::Upstream {
                service: service.to_string(),
                message: format!("{} returned {}: {}", url, status, text),
            });
        }

        response.json::<T>().await.map_err(|e| AppError::Upstream {
            service: service.to_string(),
            message: format!("Invalid response body: {}", e),
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl ResearchStage for RemoteStages {
    async fn research(&self, topic: &str, max_sources: usize) -> Result<ResearchResult> {
        let body = json!({ "topic": topic, "max_sources": max_sources });
        let result: ResearchResult = self
            .post("research", format!("{}/v2/research", self.research_url), &body)
            .await?;
        Ok(result.normalized())
    }
}

#[async_trait]
impl AnalysisStage for RemoteStages {
    async fn analyze(
        &self,
        topic: &str,
        document_text: &str,
        research: &ResearchResult,
    ) -> Result<AnalysisResult> {
        let body = json!({
            "topic": topic,
            "document_text": document_text,
            "research_data": research,
        });
        self.post("analyzer", format!("{}/v2/analyze", self.analyzer_url), &body)
            .await
    }
}

#[async_trait]
impl WritingStage for RemoteStages {
    async fn write(
        &self,
        topic: &str,
        outline: &Outline,
        research: &ResearchResult,
        document_text: &str,
    ) -> Result<Report> {
        let body = json!({
            "topic": topic,
            "outline": outline,
            "research_data": research,
            "document_text": document_text,
        });
        self.post("writer", format!("{}/v2/write", self.writer_url), &body)
            .await
    }
}
