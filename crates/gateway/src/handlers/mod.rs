//! API handlers module
//!
//! Request bodies arrive as raw JSON so a missing or wrong-typed field is
//! reported by name instead of as a generic deserialization failure.

pub mod analyze;
pub mod health;
pub mod process;
pub mod research;
pub mod write;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use reportforge_common::errors::{AppError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Map a body read failure; an over-limit body is `PayloadTooLarge`
pub(crate) fn body_error(status: StatusCode, limit: usize, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::InvalidFormat { message }
    }
}

/// Unwrap a JSON body, mapping parse failures to a client error
pub(crate) fn json_body(
    body: std::result::Result<Json<Value>, JsonRejection>,
    limit: usize,
) -> Result<Value> {
    let Json(value) = body.map_err(|e| {
        body_error(
            e.status(),
            limit,
            format!("Invalid JSON in request body: {}", e.body_text()),
        )
    })?;
    if !value.is_object() {
        return Err(AppError::InvalidFormat {
            message: "Request body must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

pub(crate) fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str> {
    match body.get(field) {
        None | Some(Value::Null) => Err(AppError::MissingField {
            field: field.to_string(),
        }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(AppError::invalid_field(field, format!("'{}' must be a string", field))),
    }
}

pub(crate) fn required_object<'a>(body: &'a Value, field: &str) -> Result<&'a Value> {
    match body.get(field) {
        None | Some(Value::Null) => Err(AppError::MissingField {
            field: field.to_string(),
        }),
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(AppError::invalid_field(field, format!("'{}' must be an object", field))),
    }
}

/// Non-blank, trimmed topic
pub(crate) fn topic(body: &Value) -> Result<String> {
    let topic = required_str(body, "topic")?.trim();
    if topic.is_empty() {
        return Err(AppError::invalid_field("topic", "'topic' must be a non-empty string"));
    }
    Ok(topic.to_string())
}

/// First failing field of a validator run
pub(crate) fn validation_error(errors: validator::ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|k| k.to_string());
    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}

/// The engine, or a "not configured" error naming it
pub(crate) fn engine<'a, T: ?Sized>(engine: &'a Option<Arc<T>>, component: &str) -> Result<&'a Arc<T>> {
    engine.as_ref().ok_or_else(|| AppError::NotConfigured {
        component: component.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use reportforge_common::config::AppConfig;
    use reportforge_common::llm::{CompletionRequest, LlmClient, MockLlmClient};
    use reportforge_common::search::{MockSearchClient, SearchResult, WebSearchClient};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Replies keyed on the kind of prompt
    pub fn scripted(request: &CompletionRequest) -> std::result::Result<String, String> {
        let prompt = request.prompt.as_str();
        let reply = if prompt.contains("Break down this research topic") {
            r#"["rollup fees"]"#
        } else if prompt.contains("executive summary") {
            "Rollups lower fees."
        } else if prompt.contains("key findings") {
            r#"["Rollups batch many transactions into one proof"]"#
        } else if prompt.contains("main themes") {
            r#"["rollups", "fees"]"#
        } else if prompt.contains("structured outline") {
            r#"{"sections": [{"title": "Overview", "topics": ["fees"], "priority": "high"}]}"#
        } else {
            "Section text."
        };
        Ok(reply.to_string())
    }

    pub fn configured_router() -> Router {
        configured_router_with(AppConfig::default())
    }

    pub fn configured_router_with(mut config: AppConfig) -> Router {
        config.pipeline.section_min_delay_ms = 0;
        config.rate_limit.enabled = false;

        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::from_fn(scripted));
        let search: Arc<dyn WebSearchClient> = Arc::new(MockSearchClient::new().with_default(vec![
            SearchResult::new("https://www.reuters.com/a", "Rollups", "Fees fell"),
            SearchResult::new("https://www.reddit.com/b", "Thread", "opinions"),
        ]));
        crate::create_router(AppState::with_clients(config, Some(llm), Some(search)))
    }

    pub fn unconfigured_router() -> Router {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        crate::create_router(AppState::with_clients(config, None, None))
    }

    pub async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, request).await
    }

    pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
