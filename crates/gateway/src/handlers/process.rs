//! Full pipeline handler: uploaded document + topic in, report out

use axum::{
    extract::{Multipart, State},
    Json,
};
use reportforge_common::{
    errors::{AppError, Result},
    pipeline::{generate_filename, generate_title, PipelineOutcome},
};
use serde::Serialize;

use super::{body_error, engine};
use crate::AppState;

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub title: String,
    pub filename_base: String,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart, limit: usize) -> Result<(Upload, String)> {
    let mut upload = None;
    let mut topic = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        body_error(e.status(), limit, format!("Malformed multipart body: {}", e.body_text()))
    })? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    body_error(e.status(), limit, format!("Failed to read upload: {}", e.body_text()))
                })?;
                upload = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("topic") => {
                let text = field.text().await.map_err(|e| {
                    body_error(e.status(), limit, format!("Failed to read topic: {}", e.body_text()))
                })?;
                topic = Some(text);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    if upload.filename.trim().is_empty() {
        return Err(AppError::invalid_field("file", "No file selected"));
    }

    let topic = topic.ok_or_else(|| AppError::MissingField {
        field: "topic".to_string(),
    })?;
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(AppError::invalid_field("topic", "Topic cannot be empty"));
    }

    Ok((upload, topic.to_string()))
}

/// Run the whole pipeline for one upload
pub async fn process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    let pipeline = engine(&state.pipeline, "Pipeline")?;
    let (upload, topic) = read_form(multipart, state.config.server.max_upload_bytes).await?;

    let title = generate_title(&topic);
    tracing::info!(
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        topic = %topic,
        title = %title,
        "Processing upload"
    );

    let outcome = pipeline
        .run(&upload.bytes, &upload.filename, &title, None)
        .await?;

    Ok(Json(ProcessResponse {
        success: true,
        filename_base: generate_filename(&title),
        title,
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{
        configured_router, configured_router_with, send, unconfigured_router,
    };
    use reportforge_common::config::AppConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    const BOUNDARY: &str = "reportforge-boundary";

    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n",
                    name, filename
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::post("/v2/process")
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_process_runs_pipeline() {
        let request = multipart(&[
            ("file", Some("notes.txt"), "Rollups cut fees."),
            ("topic", None, "rollup economics"),
        ]);
        let (status, body) = send(configured_router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["title"], "Rollup Economics Overview");
        assert_eq!(body["filename_base"], "rollup_economics_overview");
        assert_eq!(body["topic"], "Rollup Economics Overview");
        assert_eq!(body["document_analysis"]["text_length"], 17);
        assert_eq!(body["research_summary"]["sources_found"], 2);
        assert!(body["report"]["markdown"]
            .as_str()
            .unwrap()
            .starts_with("# Rollup Economics Overview"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let request = multipart(&[("topic", None, "rollups")]);
        let (status, body) = send(configured_router(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "file");
    }

    #[tokio::test]
    async fn test_empty_topic() {
        let request = multipart(&[("file", Some("a.txt"), "text"), ("topic", None, "  ")]);
        let (status, body) = send(configured_router(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "topic");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let mut config = AppConfig::default();
        config.server.max_upload_bytes = 128;
        let text = "word ".repeat(100);
        let request = multipart(&[("file", Some("big.txt"), &text), ("topic", None, "rollups")]);
        let (status, body) = send(configured_router_with(config), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_pipeline_not_configured() {
        let request = multipart(&[("file", Some("a.txt"), "text"), ("topic", None, "rollups")]);
        let (status, body) = send(unconfigured_router(), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "NOT_CONFIGURED");
    }
}
