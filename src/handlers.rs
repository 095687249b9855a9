//! HTTP endpoints for creating and resolving splits.
//!
//! - `GET /api/split` – machine-readable description of the create endpoint
//! - `POST /api/split` – compute and persist a split, returning a payment link
//! - `GET /api/split/{id}` – resolve a payment link id to its record
//! - `GET /health` – liveness probe
//!
//! Storage failures are logged with their cause and reported to clients as a generic
//! `500 Internal Server Error`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use crate::proto::{CreateSplitBody, ErrorResponse, SuccessResponse};
use crate::service::{CreateSplitError, SplitService};
use crate::split::{SplitError, SplitMode, SplitRequest};
use crate::store::{KeyValueStore, StoreError};

const INTERNAL_ERROR: &str = "Internal Server Error";

pub fn routes<S>() -> Router<Arc<SplitService<S>>>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    Router::new()
        .route("/api/split", get(get_split_info).post(post_split::<S>))
        .route("/api/split/{id}", get(get_split::<S>))
        .route("/health", get(get_health))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// `GET /api/split`: describes the body accepted by `POST /api/split`.
#[instrument(skip_all)]
pub async fn get_split_info() -> impl IntoResponse {
    let modes: Vec<&str> = SplitMode::variants().iter().map(SplitMode::as_str).collect();
    Json(json!({
        "endpoint": "/api/split",
        "description": "POST to create a split and receive a shareable payment link",
        "body": {
            "totalAmount": "number | string, > 0",
            "peopleCount": "integer | string, >= 1",
            "splitMode": modes,
            "tipPercentage": "number >= 0, tip mode only",
            "shares": "number[], one per person; percentages (percentage) or amounts (custom)",
        }
    }))
}

/// `POST /api/split`: validates the request, stores a record, and returns its payment link.
#[instrument(skip_all)]
pub async fn post_split<S>(
    State(service): State<Arc<SplitService<S>>>,
    body: Result<Json<CreateSplitBody>, JsonRejection>,
) -> Response
where
    S: KeyValueStore + Send + Sync + 'static,
{
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected split body");
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let request = match SplitRequest::try_from(body) {
        Ok(request) => request,
        Err(error) => return split_error_response(error),
    };

    match service.create_split(request).await {
        Ok(created) => (StatusCode::OK, Json(SuccessResponse::new(created))).into_response(),
        Err(CreateSplitError::Split(error)) => split_error_response(error),
        Err(CreateSplitError::Store(error)) => {
            tracing::error!(error = %error, "Failed to store split");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

fn split_error_response(error: SplitError) -> Response {
    tracing::warn!(error = %error, "Split request rejected");
    match error {
        SplitError::InvalidInput(message) => error_response(StatusCode::BAD_REQUEST, message),
        SplitError::ValidationFailed {
            sum,
            target,
            tolerance,
        } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("Shares must add up to {target}"),
                "sum": sum,
                "target": target,
                "tolerance": tolerance,
            })),
        )
            .into_response(),
    }
}

/// `GET /api/split/{id}`: returns the record behind a payment link.
#[instrument(skip_all)]
pub async fn get_split<S>(
    State(service): State<Arc<SplitService<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: KeyValueStore + Send + Sync + 'static,
{
    match service.get_split(&id).await {
        Ok(view) => (StatusCode::OK, Json(SuccessResponse::new(view))).into_response(),
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, "Split not found"),
        Err(error) => {
            tracing::error!(error = %error, id = %id, "Failed to read split");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// `GET /health`
pub async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
