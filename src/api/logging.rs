use axum::{
    body::{Body, to_bytes},
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::error::ApiError;

/// Largest request body buffered for logging; larger bodies are rejected.
pub const MAX_LOGGED_BODY: usize = 1024 * 1024;

/// Logs the full request body, then the status, response body and duration.
pub async fn log_bodies(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("could not read request body for {method} {uri}: {e}");
            return ApiError::Validation("request body is unreadable or too large".into())
                .into_response();
        }
    };
    tracing::info!(
        "Incoming request: {method} {uri}\nRequest body: {}",
        String::from_utf8_lossy(&bytes)
    );

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ApiError::Internal(anyhow::anyhow!("could not read response body: {e}"))
                .into_response();
        }
    };
    tracing::info!(
        "Request completed: {method} {uri}\nStatus: {}\nResponse body: {}\nDuration: {:.3}s",
        parts.status.as_u16(),
        String::from_utf8_lossy(&bytes),
        start.elapsed().as_secs_f64()
    );

    Response::from_parts(parts, Body::from(bytes))
}
