use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::data_models::ErrorPayload;

pub const MISSING_QUERY_MESSAGE: &str = "Поле 'query' обязательно";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const BUSY_MESSAGE: &str = "Server is busy, try again later";

/// The upstream a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Search,
    Completion,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Search => write!(f, "search"),
            Service::Completion => write!(f, "completion"),
        }
    }
}

/// A pipeline stage failure. Everything except `MalformedResponse` is
/// reported in-band with a 200 status.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("{service} service responded with status {status}")]
    UpstreamStatus { service: Service, status: u16 },

    #[error("network error calling {service} service")]
    Network {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("search service returned no content")]
    EmptyContent,

    #[error("completion service returned no text")]
    EmptyCompletion,

    #[error("{service} service returned an unreadable body")]
    MalformedResponse {
        service: Service,
        #[source]
        source: reqwest::Error,
    },
}

impl Failure {
    /// In-band payload for this failure, or `None` when it must surface as a 500.
    pub fn in_band(&self) -> Option<ErrorPayload> {
        let (error, status) = match self {
            Failure::UpstreamStatus {
                service: Service::Search,
                status,
            } => ("Ошибка при запросе к поиску", Some(*status)),
            Failure::UpstreamStatus {
                service: Service::Completion,
                status,
            } => ("Ошибка при запросе к YandexGPT", Some(*status)),
            Failure::Network {
                service: Service::Search,
                ..
            } => ("Ошибка сети при запросе к поиску", None),
            Failure::Network {
                service: Service::Completion,
                ..
            } => ("Ошибка сети при запросе к YandexGPT", None),
            Failure::EmptyContent => ("Поиск не вернул контент", None),
            Failure::EmptyCompletion => ("GPT не дал ответа", None),
            Failure::MalformedResponse { .. } => return None,
        };
        Some(ErrorPayload {
            error: error.to_string(),
            status,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("admission queue is full ({0} waiting)")]
    QueueFull(usize),
}

/// Errors that leave the API with a non-200 status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("query field is required")]
    MissingQuery,

    #[error(transparent)]
    Overloaded(#[from] AdmissionError),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MissingQuery => StatusCode::BAD_REQUEST,
            ApiError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Validation(detail) => detail.clone(),
            ApiError::MissingQuery => MISSING_QUERY_MESSAGE.to_string(),
            ApiError::Overloaded(e) => {
                tracing::warn!("rejecting request: {e}");
                BUSY_MESSAGE.to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal server error: {e:#}");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };
        (self.status_code(), Json(json!({ "error": message }))).into_response()
    }
}

#[test]
fn test_in_band_messages() {
    let search_status = Failure::UpstreamStatus {
        service: Service::Search,
        status: 503,
    };
    assert_eq!(
        search_status.in_band(),
        Some(ErrorPayload {
            error: "Ошибка при запросе к поиску".into(),
            status: Some(503),
        })
    );

    let completion_status = Failure::UpstreamStatus {
        service: Service::Completion,
        status: 429,
    };
    assert_eq!(
        completion_status.in_band().unwrap().error,
        "Ошибка при запросе к YandexGPT"
    );

    assert_eq!(
        Failure::EmptyContent.in_band().unwrap().error,
        "Поиск не вернул контент"
    );
    assert_eq!(
        Failure::EmptyCompletion.in_band(),
        Some(ErrorPayload {
            error: "GPT не дал ответа".into(),
            status: None,
        })
    );
}

#[test]
fn test_api_error_status_codes() {
    assert_eq!(ApiError::MissingQuery.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        ApiError::Validation("bad id".into()).status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::from(AdmissionError::QueueFull(8)).status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        ApiError::from(anyhow::anyhow!("boom")).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
