// HTTP routes and request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::models::{CheckRequest, CheckResponse, ErrorBody};
use crate::openapi;
use crate::state::AppState;
use crate::terms;

/// Build the application router with all routes and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/check", post(check))
        .route("/openapi.json", get(openapi_json))
        .route("/terms", get(terms_page))
        .route("/skyfire-webhook", post(skyfire_webhook))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Data Validator Agent is running!",
        "price_per_request": state.price_label(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Validate the provided data.
#[utoipa::path(
    post,
    path = "/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Validation result", body = CheckResponse),
        (status = 422, description = "Invalid request body", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
        (status = 502, description = "AI service error", body = ErrorBody),
        (status = 503, description = "AI service unavailable", body = ErrorBody),
        (status = 504, description = "AI service timeout", body = ErrorBody)
    )
)]
pub async fn check(
    State(state): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Json(request) = payload?;
    let data = request.data.trim();
    if data.is_empty() {
        return Err(ApiError::InvalidInput("data must not be empty".into()));
    }

    let verdict = state.checker.check(data).await?;
    info!(
        correct = verdict.is_correct(),
        recognized = verdict.is_recognized(),
        "check completed"
    );

    Ok(Json(CheckResponse {
        result: verdict.to_string(),
        price: state.price_per_request,
    }))
}

async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::document(state.price_per_request))
}

async fn terms_page(State(state): State<AppState>) -> Html<String> {
    Html(terms::render_terms(state.price_per_request))
}

/// Receive payment notifications from Skyfire. The payload is logged and
/// acknowledged; no verification or billing happens here.
async fn skyfire_webhook(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    info!(%payload, "Skyfire webhook received");
    Ok(Json(json!({ "status": "received" })))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
