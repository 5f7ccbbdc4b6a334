//! Route handlers. Success bodies carry a `message` plus the payload.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use legaleagle_core::{ActionItemLifecycle, NewRule};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiError, AppState};
use crate::evaluate::Evaluator;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub(crate) struct RuleNames {
    #[serde(default)]
    pub(crate) names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    pub(crate) q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewDocument {
    pub(crate) title: String,
    pub(crate) text: String,
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    ApiError::new(StatusCode::NOT_FOUND, "not found")
}

/// GET /api/health
pub(crate) async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// GET /api/rules
pub(crate) async fn handle_list_rules(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let rules = state.store.all_rules()?;
    Ok(Json(json!({
        "message": "Rules retrieved successfully",
        "rules": rules,
    })))
}

/// POST /api/rules
pub(crate) async fn handle_create_rule(
    State(state): State<Arc<AppState>>,
    Json(rule): Json<NewRule>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if rule.name.trim().is_empty() {
        return Err(ApiError::bad_request("rule name is required"));
    }
    let rule = state.store.add_rule(rule)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Rule created successfully", "rule": rule})),
    ))
}

/// POST /api/rules/by-names
pub(crate) async fn handle_rules_by_names(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RuleNames>,
) -> ApiResult<Json<Value>> {
    let rules = state.store.rules_by_names(&body.names)?;
    Ok(Json(json!({
        "message": "Rules retrieved successfully",
        "rules": rules,
    })))
}

/// GET /api/dashboard
pub(crate) async fn handle_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let documents = state.store.all_documents()?;
    Ok(Json(json!({
        "message": "Documents retrieved successfully",
        "documents": documents,
    })))
}

/// GET /api/search?q=
pub(crate) async fn handle_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter 'q' is required"))?;
    let documents = state.store.search_documents(query)?;
    Ok(Json(json!({
        "message": "Search completed",
        "documents": documents,
    })))
}

/// POST /api/documents
pub(crate) async fn handle_add_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("document title is required"));
    }
    let document = state.store.add_document(body.title.trim(), &body.text)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Document added successfully", "document": document})),
    ))
}

/// POST /api/documents/{id}/evaluate
pub(crate) async fn handle_evaluate_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let Some(classifier) = state.classifier.as_deref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "classifier is not configured",
        ));
    };
    let report = Evaluator::new(&state.store, classifier, &state.extractor, &state.scorer)
        .evaluate(&id)
        .await?;
    Ok(Json(json!({
        "message": "Document evaluated successfully",
        "report": report,
    })))
}

/// GET /api/action-items
pub(crate) async fn handle_action_items(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let pending = ActionItemLifecycle::new(&state.store).pending_with_titles()?;
    Ok(Json(json!({
        "message": "Action items retrieved successfully",
        "action_items": pending.items,
        "missing_titles": pending.missing_titles,
    })))
}

/// GET /api/action-items/pending
pub(crate) async fn handle_pending_action_items(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Value>> {
    let items = ActionItemLifecycle::new(&state.store).pending()?;
    Ok(Json(json!({
        "message": "Action items retrieved successfully",
        "action_items": items,
    })))
}

/// PUT /api/action-items/{id}/complete
pub(crate) async fn handle_complete_action_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let item = ActionItemLifecycle::new(&state.store).complete(&id)?;
    Ok(Json(json!({
        "message": "Action item completed successfully",
        "action_item": item,
    })))
}
