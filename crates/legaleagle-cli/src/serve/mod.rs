//! HTTP API over the store, classifier, and remediation pipeline.

mod handlers;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use legaleagle_ai::Classifier;
use legaleagle_core::{PipelineConfig, RemediationError, RiskScorer, RuleNameExtractor};
use legaleagle_store::{DuckStore, StoreError};
use tracing::{error, info};

use crate::evaluate::EvaluateError;
use handlers::*;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) store: DuckStore,
    /// `None` when no API key is configured; evaluation is then unavailable.
    pub(crate) classifier: Option<Arc<dyn Classifier>>,
    pub(crate) extractor: RuleNameExtractor,
    pub(crate) scorer: RiskScorer,
}

impl AppState {
    pub(crate) fn new(
        store: DuckStore,
        classifier: Option<Arc<dyn Classifier>>,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            extractor: pipeline.extractor(),
            scorer: pipeline.risk_scorer(),
        }
    }
}

/// Error response: `{"error": message}` with a status code.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 with the error text, or a generic 500 with the detail logged.
    fn classify(e: &dyn std::error::Error, not_found: bool) -> Self {
        if not_found {
            return Self::new(StatusCode::NOT_FOUND, e.to_string());
        }
        error!(error = %e, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({"error": self.message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::classify(&e, e.is_not_found())
    }
}

impl From<RemediationError> for ApiError {
    fn from(e: RemediationError) -> Self {
        Self::classify(&e, e.is_not_found())
    }
}

impl From<EvaluateError> for ApiError {
    fn from(e: EvaluateError) -> Self {
        Self::classify(&e, e.is_not_found())
    }
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/rules", get(handle_list_rules).post(handle_create_rule))
        .route("/api/rules/by-names", post(handle_rules_by_names))
        .route("/api/dashboard", get(handle_dashboard))
        .route("/api/search", get(handle_search))
        .route("/api/documents", post(handle_add_document))
        .route("/api/documents/{id}/evaluate", post(handle_evaluate_document))
        .route("/api/action-items", get(handle_action_items))
        .route("/api/action-items/pending", get(handle_pending_action_items))
        .route(
            "/api/action-items/{id}/complete",
            put(handle_complete_action_item),
        )
        .fallback(handle_not_found)
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    store: DuckStore,
    classifier: Option<Arc<dyn Classifier>>,
    pipeline: &PipelineConfig,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(store, classifier, pipeline));
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "legaleagle API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
