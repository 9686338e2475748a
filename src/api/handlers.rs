use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;

use crate::data_models::PipelineOutcome;
use crate::error::ApiError;

use super::AppState;
use super::models::{AnswerRequest, HealthResponse};

pub async fn request_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PipelineOutcome>, ApiError> {
    let request = parse_request(&body)?;

    let slot = state.admission.admit().await?;
    tracing::debug!(
        in_flight = state.admission.in_flight(),
        queued = state.admission.queued(),
        "request admitted"
    );

    match state
        .orchestrator
        .run(&slot, request.id, &request.query)
        .await
    {
        Ok(payload) => Ok(Json(PipelineOutcome::Answered(payload))),
        Err(failure) => match failure.in_band() {
            Some(payload) => Ok(Json(PipelineOutcome::Failed(payload))),
            None => Err(ApiError::Internal(failure.into())),
        },
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        in_flight: state.admission.in_flight(),
        queued: state.admission.queued(),
    })
}

/// Query presence is checked before the rest of the shape, so a body missing
/// both fields reports the missing query.
fn parse_request(body: &[u8]) -> Result<AnswerRequest, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {e}")))?;

    let has_query = value
        .get("query")
        .and_then(Value::as_str)
        .is_some_and(|q| !q.is_empty());
    if !has_query {
        return Err(ApiError::MissingQuery);
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::error!("Validation error: {e}");
        ApiError::Validation(format!("invalid request: {e}"))
    })
}

#[test]
fn test_parse_request() {
    let request = parse_request(br#"{"id": 7, "query": "q"}"#).unwrap();
    assert_eq!(request.id, 7);
    assert_eq!(request.query, "q");

    assert!(matches!(
        parse_request(br#"{"id": 7}"#),
        Err(ApiError::MissingQuery)
    ));
    assert!(matches!(
        parse_request(br#"{"id": 7, "query": ""}"#),
        Err(ApiError::MissingQuery)
    ));
    assert!(matches!(parse_request(b"{}"), Err(ApiError::MissingQuery)));
    assert!(matches!(
        parse_request(br#"{"query": "x"}"#),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        parse_request(br#"{"id": "seven", "query": "x"}"#),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        parse_request(b"not json"),
        Err(ApiError::Validation(_))
    ));
}
