//! Domain errors for the RAG pipeline service.

use thiserror::Error;

/// Opaque reason surfaced to callers when internal detail must not leak.
pub const OPAQUE_FAILURE: &str = "Failed to process request";

/// Errors produced by the orchestration layer.
///
/// Collaborators (model backends, extractors, embedders) report failures with
/// `anyhow`; services translate them into one of these variants at their
/// boundary so every outcome maps onto a well-defined caller-visible status.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model is still loading. Please wait.")]
    ServiceNotReady,

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("No model handle available to build the pipeline")]
    ModelUnavailable,

    #[error("Failed to index document: {0}")]
    IndexBuild(String),

    #[error("No document found for this user. Upload a document first.")]
    NoDocumentForUser,

    #[error("QA pipeline is not ready. Upload a document first.")]
    PipelineNotReady,

    #[error("Failed to process request")]
    Generation(String),

    #[error("Invalid user_id '{0}': use 1-64 ASCII letters, digits or '-'")]
    InvalidUserId(String),

    #[error("Invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("Unsupported file type '{0}'")]
    UnsupportedFileType(String),

    #[error("Upload exceeds the {limit_bytes} byte limit")]
    UploadTooLarge { limit_bytes: u64 },

    #[error("Upload interrupted: {0}")]
    Upload(String),

    #[error("Failed to process request")]
    Storage(String),
}

impl ServiceError {
    /// Stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ServiceNotReady => "SERVICE_NOT_READY",
            Self::ModelLoad(_) => "MODEL_LOAD_FAILED",
            Self::ModelUnavailable => "MODEL_UNAVAILABLE",
            Self::IndexBuild(_) => "INDEX_BUILD_FAILED",
            Self::NoDocumentForUser => "NO_DOCUMENT_FOR_USER",
            Self::PipelineNotReady => "PIPELINE_NOT_READY",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::InvalidUserId(_) => "INVALID_USER_ID",
            Self::InvalidFilename(_) => "INVALID_FILENAME",
            Self::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            Self::UploadTooLarge { .. } => "UPLOAD_TOO_LARGE",
            Self::Upload(_) => "UPLOAD_INTERRUPTED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the caller can fix the request by uploading or correcting input.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoDocumentForUser
                | Self::PipelineNotReady
                | Self::InvalidUserId(_)
                | Self::InvalidFilename(_)
                | Self::UnsupportedFileType(_)
                | Self::UploadTooLarge { .. }
                | Self::Upload(_)
        )
    }

    /// Whether the failure is tied to model readiness rather than the request.
    pub const fn is_readiness_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceNotReady | Self::ModelLoad(_) | Self::ModelUnavailable
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
