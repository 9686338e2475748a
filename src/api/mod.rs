use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::admission::AdmissionController;
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::orchestrator::Orchestrator;
use crate::search::SearchClient;

pub mod handlers;
pub mod logging;
pub mod models;

/// Shared per-process state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(admission: AdmissionController, orchestrator: Orchestrator) -> Self {
        Self {
            admission: Arc::new(admission),
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let search = SearchClient::new(
            http.clone(),
            &config.search_base_url,
            &config.folder_id,
            config.search_api_key.clone(),
        );
        let completion = CompletionClient::new(
            http,
            &config.completion_base_url,
            &config.folder_id,
            &config.model,
            config.completion_api_key.clone(),
        );
        let admission = AdmissionController::new(
            config.max_concurrent_requests,
            config.max_queued_requests,
            config.pacing_delay()?,
        );

        Ok(Self::new(admission, Orchestrator::new(search, completion)))
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http",
                request_id = %nanoid::nanoid!(10),
                method = %request.method(),
                uri = %request.uri(),
            )
        })
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/api/request", post(handlers::request_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(logging::log_bodies))
        .layer(trace)
        .layer(cors)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
