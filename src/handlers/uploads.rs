//! Multipart upload intake. Size and type limits are enforced before any
//! storage write; storage goes to S3 when configured, otherwise memory.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/uploads
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Value> {
    let cfg = config::config();
    if cfg.storage.require_s3 && !cfg.s3_configured() {
        return Err(ApiError::service_unavailable(
            "Object storage is not configured",
        ));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .ok_or_else(|| ApiError::validation_error("File name is required", None))?;
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());

        validate_upload(&filename, &content_type)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::payload_too_large(format!("Upload too large: {}", e)))?;
        if data.len() > cfg.uploads.max_bytes {
            return Err(ApiError::payload_too_large(format!(
                "File exceeds the {} byte limit",
                cfg.uploads.max_bytes
            )));
        }

        let key = format!("{}-{}", Uuid::new_v4(), filename);
        let url = state
            .store
            .put(&key, data, &content_type)
            .await
            .map_err(|e| ApiError::service_unavailable(e.to_string()))?;

        return Ok(ApiResponse::created(json!({ "key": key, "url": url })));
    }

    Err(ApiError::validation_error("No file field in request", None))
}

/// DELETE /api/uploads/:key
pub async fn delete(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<Value> {
    state.store.delete(&key).await.map_err(|e| match e {
        crate::services::storage::StorageError::NotFound(k) => {
            ApiError::not_found(format!("Object {} not found", k))
        }
        other => ApiError::service_unavailable(other.to_string()),
    })?;

    Ok(ApiResponse::success(json!({ "deleted": key })))
}

/// GET /files/:key - serves memory-stored objects in development
pub async fn serve(State(state): State<AppState>, Path(key): Path<String>) -> impl IntoResponse {
    match state.store.get(&key).await {
        Some((data, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], Bytes::from(data)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "success": false,
                "error": true,
                "message": format!("Object {} not found", key),
                "code": "NOT_FOUND"
            })),
        )
            .into_response(),
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn validate_upload(filename: &str, content_type: &str) -> Result<(), ApiError> {
    let cfg = &config::config().uploads;

    let extension = filename.rsplit('.').next().map(str::to_lowercase);
    let allowed_ext = extension
        .as_deref()
        .map(|ext| cfg.allowed_extensions.iter().any(|a| a == ext))
        .unwrap_or(false);
    if !allowed_ext || !filename.contains('.') {
        return Err(ApiError::validation_error(
            format!("File type not allowed: {}", filename),
            None,
        ));
    }

    let allowed_type = content_type.starts_with("image/") || content_type == "application/pdf";
    if !allowed_type {
        return Err(ApiError::validation_error(
            format!("Content type not allowed: {}", content_type),
            None,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlisted_files_pass() {
        assert!(validate_upload("photo.png", "image/png").is_ok());
        assert!(validate_upload("doc.pdf", "application/pdf").is_ok());
        assert!(validate_upload("PHOTO.JPG", "image/jpeg").is_ok());
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        assert!(validate_upload("script.sh", "image/png").is_err());
        assert!(validate_upload("noextension", "image/png").is_err());
    }

    #[test]
    fn disallowed_content_type_is_rejected() {
        assert!(validate_upload("photo.png", "text/html").is_err());
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("a b/c.png"), "a_b_c.png");
        assert_eq!(sanitize_filename("ok-file_1.png"), "ok-file_1.png");
    }
}
