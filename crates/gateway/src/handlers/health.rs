//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub engines: EngineStatus,
}

#[derive(Serialize)]
pub struct EngineStatus {
    pub research: &'static str,
    pub analyzer: &'static str,
    pub writer: &'static str,
    pub pipeline: &'static str,
}

fn status<T: ?Sized>(engine: &Option<Arc<T>>) -> &'static str {
    if engine.is_some() {
        "ready"
    } else {
        "not_configured"
    }
}

/// Liveness probe with per-engine readiness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.observability.service_name.clone(),
        version: reportforge_common::VERSION,
        engines: EngineStatus {
            research: status(&state.research),
            analyzer: status(&state.analysis),
            writer: status(&state.writing),
            pipeline: status(&state.pipeline),
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{configured_router, send, unconfigured_router};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn get_health() -> Request<Body> {
        Request::get("/v2/health").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_all_engines_ready() {
        let (status, body) = send(configured_router(), get_health()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["engines"]["research"], "ready");
        assert_eq!(body["engines"]["pipeline"], "ready");
    }

    #[tokio::test]
    async fn test_missing_credentials_reported() {
        let (_, body) = send(unconfigured_router(), get_health()).await;

        assert_eq!(body["engines"]["research"], "not_configured");
        assert_eq!(body["engines"]["writer"], "not_configured");
    }
}
