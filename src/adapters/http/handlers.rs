//! Route handlers

use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use tracing::{error, info};

use super::error::ApiError;
use super::server::AppState;
use super::types::{
    ChatRequest, ChatResponse, ConfigResponse, MetadataResponse, UploadResponse, UserQuery,
};
use crate::domain::models::validate_user_id;
use crate::domain::ServiceError;

const UPLOAD_FIELD: &str = "file";

pub async fn metadata() -> Json<MetadataResponse> {
    Json(MetadataResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let report = state.health.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    // Readiness is checked before touching the body
    state.upload.check_ready()?;
    let user_id = query.user_id.unwrap_or_default();
    validate_user_id(&user_id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(ServiceError::Upload(e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let document = state
            .upload
            .handle_upload(&user_id, &filename, field)
            .await?;

        info!(user_id = %user_id, path = %document.path.display(), "Upload complete");
        return Ok(Json(UploadResponse {
            message: "Document processed and stored successfully".to_string(),
            file_path: document.path.display().to_string(),
        }));
    }

    Err(ApiError(ServiceError::Upload(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    ))))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // A missing user_id fails validation inside the service
    let user_id = query.user_id.unwrap_or_default();
    let response = state.chat.handle_chat(&user_id, &request.messages).await?;
    Ok(Json(ChatResponse { response }))
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(state.descriptor.clone())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, crate::services::ServiceMetrics::content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
