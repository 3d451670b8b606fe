//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::warn;

use crate::aggregate::CrossingError;
use crate::arcgis::FeatureServiceError;
use crate::domain::CrossingLocationId;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/crossing/:id", get(get_crossing))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Look up one crossing by location ID.
async fn get_crossing(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<CrossingResponse>, AppError> {
    let id: CrossingLocationId = raw_id.parse().map_err(|_| AppError::BadRequest {
        message: format!("Invalid crossing location id: {raw_id}"),
    })?;

    let report = state
        .crossings
        .with_timeout(id, state.request_timeout)
        .await?;

    Ok(Json(report.into()))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// The feature service failed or sent something unusable.
    BadGateway { code: i64, message: String },
    GatewayTimeout { message: String },
}

impl From<CrossingError> for AppError {
    fn from(e: CrossingError) -> Self {
        let message = e.to_string();
        match e {
            CrossingError::NotFound(_) => AppError::NotFound { message },
            CrossingError::Timeout(_) => AppError::GatewayTimeout { message },
            CrossingError::FeatureService(FeatureServiceError::Service { code: 404, .. }) => {
                AppError::NotFound { message }
            }
            CrossingError::FeatureService(FeatureServiceError::Service { code, .. }) => {
                AppError::BadGateway { code, message }
            }
            CrossingError::FeatureService(_) | CrossingError::IdentifierMismatch { .. } => {
                AppError::BadGateway {
                    code: StatusCode::BAD_GATEWAY.as_u16().into(),
                    message,
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, None, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, None, message),
            AppError::BadGateway { code, message } => (StatusCode::BAD_GATEWAY, Some(code), message),
            AppError::GatewayTimeout { message } => (StatusCode::GATEWAY_TIMEOUT, None, message),
        };

        warn!(status = status.as_u16(), %message, "request failed");

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.unwrap_or_else(|| status.as_u16().into()),
                message,
            },
        });
        (status, body).into_response()
    }
}
