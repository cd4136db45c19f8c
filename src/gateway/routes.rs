//! API route handlers for the gateway.

use super::range::{parse_range, Unsatisfiable};
use super::AppState;
use crate::chat::{ChatError, ChatRequest, ChatResponse};
use crate::error::PortalError;
use crate::files::{self, extract, DocumentFormat, FileKind, FileListing, FileStorage, StoredFile};
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

type ApiResult<T> = Result<T, PortalError>;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// How an upload endpoint finds, filters and reports its file field.
struct UploadRule {
    field: &'static str,
    kind: FileKind,
    accepts: fn(&str) -> bool,
    missing: &'static str,
    rejected: &'static str,
    failed: &'static str,
}

const VIDEO_UPLOAD: UploadRule = UploadRule {
    field: "video",
    kind: FileKind::Video,
    accepts: files::is_video_name,
    missing: "No video file uploaded",
    rejected: "Only video files are allowed!",
    failed: "Failed to upload video",
};

const MATERIAL_UPLOAD: UploadRule = UploadRule {
    field: "material",
    kind: FileKind::Material,
    accepts: is_material_name,
    missing: "No material file uploaded",
    rejected: "Only PDF, DOC, DOCX, TXT, and RTF files are allowed!",
    failed: "Failed to upload material",
};

fn is_material_name(filename: &str) -> bool {
    files::extension_of(filename).is_some_and(|ext| DocumentFormat::from_extension(&ext).is_ok())
}

fn body_error(e: MultipartError) -> PortalError {
    tracing::warn!(error = %e, "Malformed multipart upload");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PortalError::TooLarge("File too large".into())
    } else {
        PortalError::invalid(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Stream the rule's file field to disk chunk by chunk.
async fn receive_upload(
    storage: &FileStorage,
    multipart: &mut Multipart,
    rule: &UploadRule,
) -> ApiResult<StoredFile> {
    while let Some(mut field) = multipart.next_field().await.map_err(body_error)? {
        if field.name() != Some(rule.field) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if !(rule.accepts)(&original_name) {
            return Err(PortalError::invalid(rule.rejected));
        }

        let write_failed = |e: anyhow::Error| {
            tracing::error!(error = %e, file = %original_name, "Upload write failed");
            PortalError::Upload(rule.failed.into())
        };
        let mut upload = storage
            .begin(rule.kind, &original_name)
            .await
            .map_err(write_failed)?;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    upload.discard().await;
                    return Err(body_error(e));
                }
            };
            if let Err(e) = upload.write(&chunk).await {
                upload.discard().await;
                return Err(write_failed(e));
            }
        }
        return upload.finish().await.map_err(write_failed);
    }
    Err(PortalError::invalid(rule.missing))
}

/// Upload a video (`video` multipart field).
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let video = receive_upload(&state.storage, &mut multipart, &VIDEO_UPLOAD).await?;
    tracing::info!(file = %video.filename, size = video.size, "Video uploaded");

    Ok(Json(serde_json::json!({
        "message": "Video uploaded successfully",
        "video": video,
    })))
}

/// Upload a reading material (`material` multipart field), extract its text
/// and append it to the corpus under the original file name.
pub async fn upload_material(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut material = receive_upload(&state.storage, &mut multipart, &MATERIAL_UPLOAD).await?;
    let original_name = material.original_name.clone();
    let ext = files::extension_of(&original_name).unwrap_or_default();

    let path = std::path::PathBuf::from(&material.path);
    let label = original_name.clone();
    let extracted = tokio::task::spawn_blocking(move || extract::extract_as(&path, &ext, &label))
        .await;
    let text = match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::error!(error = %e, file = %original_name, "Error parsing file");
            return Err(PortalError::Extraction("Failed to parse uploaded file".into()));
        }
        Err(e) => {
            tracing::error!(error = %e, file = %original_name, "Extraction task failed");
            return Err(PortalError::Extraction("Failed to parse uploaded file".into()));
        }
    };

    state.corpus.append(original_name.clone(), text.clone());
    tracing::info!(
        file = %material.filename,
        original = %original_name,
        chars = text.chars().count(),
        corpus = state.corpus.len(),
        "Material uploaded"
    );
    material.content = Some(text);

    Ok(Json(serde_json::json!({
        "message": "Material uploaded successfully",
        "material": material,
    })))
}

/// Stream a stored video, honouring a single `Range: bytes=...` request.
pub async fn stream_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let path = state
        .storage
        .resolve(FileKind::Video, &filename)
        .await
        .ok_or_else(|| PortalError::not_found("Video not found"))?;

    let open_failed = |e: std::io::Error| {
        tracing::error!(error = %e, file = %filename, "Failed to open video");
        PortalError::not_found("Video not found")
    };
    let mut file = tokio::fs::File::open(&path).await.map_err(open_failed)?;
    let size = file.metadata().await.map_err(open_failed)?.len();
    let content_type = files::guess_mime_type(&filename);

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, size))
        .transpose();

    let response = match range {
        Err(Unsatisfiable) => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{size}"))
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::empty()),
        Ok(Some(Some(r))) => {
            file.seek(SeekFrom::Start(r.start)).await.map_err(open_failed)?;
            let stream = ReaderStream::new(file.take(r.length()));
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, r.content_range(size))
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, r.length())
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from_stream(stream))
        }
        Ok(_) => Response::builder()
            .status(StatusCode::OK)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_LENGTH, size)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from_stream(ReaderStream::new(file))),
    };

    response.map_err(|e| {
        tracing::error!(error = %e, "Failed to build video response");
        PortalError::Upload("Failed to stream video".into())
    })
}

/// Download a stored material as an attachment.
pub async fn download_material(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = state
        .storage
        .resolve(FileKind::Material, &filename)
        .await
        .ok_or_else(|| PortalError::not_found("Material not found"))?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::error!(error = %e, file = %filename, "Failed to open material");
        PortalError::not_found("Material not found")
    })?;
    let size = file.metadata().await.map(|m| m.len()).ok();

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let mut response = (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(files::guess_mime_type(&filename))),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response();
    if let Some(size) = size {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    Ok(response)
}

/// List stored videos and materials.
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileListing>> {
    let listing = async {
        Ok::<_, anyhow::Error>(FileListing {
            videos: state.storage.list(FileKind::Video).await?,
            materials: state.storage.list(FileKind::Material).await?,
        })
    }
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Error getting files");
        PortalError::Listing("Failed to get files".into())
    })?;
    Ok(Json(listing))
}

/// Answer a question from uploaded materials plus web evidence.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected chat body");
            return Err(PortalError::invalid("Message is required"));
        }
    };

    match state.chat.handle(request).await {
        Ok(response) => Ok(Json(response)),
        Err(ChatError::InvalidInput) => Err(PortalError::invalid("Message is required")),
        Err(ChatError::Generation(e)) => {
            tracing::error!(error = %e, "Chat error");
            Err(PortalError::Generation {
                message: "Failed to process chat request".into(),
                details: e.to_string(),
            })
        }
    }
}
