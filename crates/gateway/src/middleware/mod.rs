//! Request middleware

pub mod rate_limit;

use axum::{extract::Request, middleware::Next, response::Response};
use reportforge_common::metrics::RequestMetrics;

/// Record request count and latency per route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let metrics = RequestMetrics::start(request.method().as_str(), request.uri().path());
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());
    response
}
