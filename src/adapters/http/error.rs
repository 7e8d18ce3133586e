//! Service error to HTTP response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::types::ErrorResponse;
use crate::domain::ServiceError;

/// A [`ServiceError`] rendered as `{"error", "code"}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

pub const fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::ServiceNotReady
        | ServiceError::ModelLoad(_)
        | ServiceError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::NoDocumentForUser
        | ServiceError::PipelineNotReady
        | ServiceError::InvalidUserId(_)
        | ServiceError::InvalidFilename(_)
        | ServiceError::UnsupportedFileType(_)
        | ServiceError::Upload(_) => StatusCode::BAD_REQUEST,
        ServiceError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ServiceError::IndexBuild(_) | ServiceError::Storage(_) | ServiceError::Generation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
