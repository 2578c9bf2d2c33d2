use crate::error::MetricsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Error body returned by every handler: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub MetricsError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MetricsError::Validation(_) => StatusCode::BAD_REQUEST,
            MetricsError::NotFound(_) => StatusCode::NOT_FOUND,
            MetricsError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
