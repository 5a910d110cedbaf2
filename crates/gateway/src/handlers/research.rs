//! Research stage handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use reportforge_common::{errors::Result, research::ResearchResult};
use serde_json::Value;
use validator::Validate;

use super::{engine, json_body, topic, validation_error};
use crate::AppState;

/// Sources kept when the request gives none or an out-of-range count
pub const DEFAULT_MAX_SOURCES: usize = 10;
const MAX_SOURCES_LIMIT: u64 = 20;

#[derive(Debug, Validate)]
pub struct ResearchRequest {
    #[validate(length(min = 1, max = 500))]
    pub topic: String,
    pub max_sources: usize,
}

impl ResearchRequest {
    pub fn from_json(body: &Value) -> Result<Self> {
        let request = Self {
            topic: topic(body)?,
            max_sources: max_sources(body),
        };
        request.validate().map_err(validation_error)?;
        Ok(request)
    }
}

/// Anything but an integer in 1..=20 silently becomes the default
fn max_sources(body: &Value) -> usize {
    body.get("max_sources")
        .and_then(Value::as_u64)
        .filter(|n| (1..=MAX_SOURCES_LIMIT).contains(n))
        .map_or(DEFAULT_MAX_SOURCES, |n| n as usize)
}

/// Research a topic
pub async fn research(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ResearchResult>> {
    let engine = engine(&state.research, "Research engine")?;
    let body = json_body(body, state.config.server.max_upload_bytes)?;
    let request = ResearchRequest::from_json(&body)?;

    tracing::info!(topic = %request.topic, max_sources = request.max_sources, "Research request");
    let result = engine.research(&request.topic, request.max_sources).await?;

    Ok(Json(result))
}
