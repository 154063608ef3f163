use crate::error::{Result, ShareError};
use crate::models::{ShareFileSummary, UploadRequest};
use crate::service::FileShareService;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FileShareService>,
}

pub fn router(service: Arc<FileShareService>, max_upload_bytes: usize) -> Router {
    let files = Router::new()
        .route("/upload", post(upload_file))
        .route("/list", get(list_files))
        .route("/cleanup", post(cleanup_expired_files))
        .route("/:file_id/info", get(get_file_info))
        .route("/:file_id/download", get(download_file))
        .route("/:file_id", delete(delete_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .nest("/api/files", files)
        .route("/api/direct", any(direct_transfer_removed))
        .route("/api/direct/*rest", any(direct_transfer_removed))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ShareFileSummary>> {
    let mut req = UploadRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                req.file_name = field.file_name().map(str::to_string);
                req.file_data = Some(field.bytes().await?.to_vec());
            }
            Some("description") => {
                req.description = Some(field.text().await?);
            }
            Some("expiryDays") => {
                let raw = field.text().await?;
                let days = raw.trim().parse().map_err(|_| {
                    ShareError::InvalidInput(format!("expiryDays is not a number: {raw}"))
                })?;
                req.expiry_days = Some(days);
            }
            _ => {}
        }
    }

    let summary = state.service.upload(req).await?;
    Ok(Json(summary))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<ShareFileSummary>>> {
    Ok(Json(state.service.list_active().await?))
}

pub async fn get_file_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<ShareFileSummary>> {
    state
        .service
        .get_info(&file_id)
        .await?
        .map(Json)
        .ok_or_else(|| ShareError::NotFound("File".to_string()))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let file = state
        .service
        .download(&file_id)
        .await?
        .ok_or_else(|| ShareError::NotFound("File".to_string()))?;

    let file_name = file
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(file_id);
    let mime_type = mime_guess::from_path(&file_name).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", sanitize_file_name(&file_name)),
            ),
            (header::CONTENT_LENGTH, file.file_size.to_string()),
        ],
        file.file_data,
    )
        .into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<StatusCode> {
    if state.service.delete(&file_id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ShareError::NotFound("File".to_string()))
    }
}

pub async fn cleanup_expired_files(State(state): State<AppState>) -> Result<Json<Value>> {
    let removed = state.service.cleanup_expired().await?;
    Ok(Json(json!({ "removed": removed })))
}

pub async fn direct_transfer_removed() -> impl IntoResponse {
    (
        StatusCode::GONE,
        "P2P direct transfer endpoints have been removed",
    )
}

// Keeps the quoted Content-Disposition value well formed.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
