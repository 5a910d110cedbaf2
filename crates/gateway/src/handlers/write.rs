//! Writing stage handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use reportforge_common::{
    analysis::Outline,
    errors::{AppError, Result},
    writer::Report,
};
use serde_json::Value;

use super::analyze::research_data;
use super::{engine, json_body, required_object, topic};
use crate::AppState;

/// Outline object carrying a `sections` array
fn outline(body: &Value) -> Result<Outline> {
    let value = required_object(body, "outline")?;
    Outline::from_value(value)
        .ok_or_else(|| AppError::invalid_field("outline", "Outline must contain 'sections' array"))
}

/// Optional `document_text`; absent means no document
fn document_text(body: &Value) -> Result<&str> {
    match body.get("document_text") {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(AppError::invalid_field(
            "document_text",
            "'document_text' must be a string",
        )),
    }
}

/// Write a full report from an outline and research data
pub async fn write(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Report>> {
    let engine = engine(&state.writing, "Writer engine")?;
    let body = json_body(body, state.config.server.max_upload_bytes)?;

    let topic = topic(&body)?;
    let outline = outline(&body)?;
    let research = research_data(&body)?;
    let document_text = document_text(&body)?;

    tracing::info!(topic = %topic, sections = outline.sections.len(), "Write request");
    let report = engine.write(&topic, &outline, &research, document_text).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{configured_router, post_json};
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_outline_requires_sections_array() {
        assert!(outline(&json!({ "outline": { "sections": [] } })).is_ok());
        let err = outline(&json!({ "outline": { "parts": [] } })).unwrap_err();
        assert!(err.to_string().contains("sections"));
    }

    #[tokio::test]
    async fn test_write_endpoint() {
        let (status, body) = post_json(
            configured_router(),
            "/v2/write",
            json!({
                "topic": "rollups",
                "outline": { "sections": [{ "title": "Fees", "topics": [{ "label": "costs" }] }] },
                "research_data": {
                    "sources": [{ "url": "https://a.com", "title": "A", "snippet": "s", "credibility_score": 0.6 }],
                    "key_findings": ["Fees fell"]
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["executive_summary"], "Rollups lower fees.");
        assert_eq!(body["sections"][0], "## Fees\n\nSection text.");
        assert_eq!(body["metadata"]["source_count"], 1);
        assert!(body["html"].as_str().unwrap().contains("<h1>rollups</h1>"));
    }

    #[tokio::test]
    async fn test_missing_outline() {
        let (status, body) = post_json(
            configured_router(),
            "/v2/write",
            json!({ "topic": "rollups", "research_data": {} }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "outline");
    }
}
