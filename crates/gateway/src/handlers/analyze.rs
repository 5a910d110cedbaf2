//! Analysis stage handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use reportforge_common::{
    analysis::AnalysisResult,
    errors::{AppError, Result},
    research::ResearchResult,
};
use serde_json::Value;

use super::{engine, json_body, required_object, required_str, topic};
use crate::AppState;

/// Parse `research_data` leniently; only a non-object is rejected
pub(crate) fn research_data(body: &Value) -> Result<ResearchResult> {
    let value = required_object(body, "research_data")?;
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::invalid_field("research_data", e.to_string()))
}

/// Compare a document against research and plan the report
pub async fn analyze(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResult>> {
    let engine = engine(&state.analysis, "Analyzer engine")?;
    let body = json_body(body, state.config.server.max_upload_bytes)?;

    let topic = topic(&body)?;
    let document_text = required_str(&body, "document_text")?;
    let research = research_data(&body)?;

    tracing::info!(
        topic = %topic,
        document_chars = document_text.chars().count(),
        sources = research.sources.len(),
        "Analysis request"
    );
    let result = engine.analyze(&topic, document_text, &research).await?;

    Ok(Json(result))
}
