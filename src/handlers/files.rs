use crate::error::AppError;
use crate::services::links::{DEFAULT_LINK_TTL_SECS, LinkService};
use crate::utils::auth::Claims;
use crate::utils::validation::{sanitize_filename, validate_mime_type};
use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Duration;
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio_util::io::{ReaderStream, StreamReader};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LinkRequest {
    pub file_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct LinkResponse {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ServeQuery {
    pub token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/upload_file",
    request_body(content = Vec<u8>, description = "Multipart upload, `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file, disallowed type, or too large"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Storage failure")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut stored: Option<(String, String, String, u64)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "file" || stored.is_some() {
            continue;
        }

        let original_name = field.file_name().unwrap_or("unnamed").to_string();
        let file_name =
            sanitize_filename(&original_name).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let body_with_io_error =
            field.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));
        let mut reader = StreamReader::new(body_with_io_error);

        // Sniff the content type from the leading bytes; the multipart
        // header is client-controlled and never trusted.
        let mut header_buffer = [0u8; 1024];
        let mut filled = 0;
        while filled < header_buffer.len() {
            let n = reader.read(&mut header_buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let head = &header_buffer[..filled];

        let kind = infer::get(head)
            .ok_or_else(|| AppError::BadRequest("Invalid file type".to_string()))?;
        let mime_type = kind.mime_type().to_string();
        validate_mime_type(&mime_type).map_err(|e| AppError::BadRequest(e.to_string()))?;

        // Random storage name, extension derived from the sniffed type
        let mut name_bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut name_bytes);
        let relative_path = format!("files/{}.{}", hex::encode(name_bytes), kind.extension());

        // Reconstruct the stream and cap it one byte past the limit so
        // oversize uploads are detected without buffering them whole
        let header_cursor = std::io::Cursor::new(head.to_vec());
        let chained = header_cursor.chain(reader);
        let limited = chained.take(state.config.max_file_size as u64 + 1);

        let size = state.storage.write_stream(&relative_path, limited).await?;
        if size > state.config.max_file_size as u64 {
            let _ = state.storage.delete(&relative_path).await;
            return Err(AppError::BadRequest("File too large".to_string()));
        }

        stored = Some((file_name, relative_path, mime_type, size));
    }

    let (file_name, relative_path, mime_type, size) =
        stored.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let file_id = Uuid::new_v4().to_string();
    let insert = sqlx::query(
        "INSERT INTO files (id, file_name, file_path, mime_type, size, uploaded_by) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&file_id)
    .bind(&file_name)
    .bind(&relative_path)
    .bind(&mime_type)
    .bind(size as i64)
    .bind(&claims.sub)
    .execute(&state.db)
    .await;

    if let Err(e) = insert {
        let _ = state.storage.delete(&relative_path).await;
        return Err(e.into());
    }

    tracing::info!(%file_id, size, %mime_type, "file uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded".to_string(),
            file_id,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/request_file",
    request_body = LinkRequest,
    responses(
        (status = 200, description = "One-time download link", body = LinkResponse),
        (status = 400, description = "Missing file_id"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Unknown file")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn request_link(
    State(state): State<crate::AppState>,
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<LinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    if payload.file_id.is_empty() {
        return Err(AppError::BadRequest("Missing file_id".to_string()));
    }

    let token = LinkService::issue(
        &state.db,
        &payload.file_id,
        Duration::seconds(DEFAULT_LINK_TTL_SECS),
    )
    .await?;

    let url = format!("{}/api/serve_file?token={}", state.config.server_url, token);
    Ok(Json(LinkResponse { url }))
}

#[utoipa::path(
    get,
    path = "/api/serve_file",
    params(
        ("token" = String, Query, description = "One-time download token")
    ),
    responses(
        (status = 200, description = "File content, streamed with content headers"),
        (status = 400, description = "Missing token"),
        (status = 404, description = "Unknown, expired, or already-redeemed token")
    ),
    tag = "files"
)]
pub async fn serve_file(
    State(state): State<crate::AppState>,
    Query(query): Query<ServeQuery>,
) -> Result<Response, AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing token".to_string()))?;

    // The link row is consumed here, before any byte is read; a failed
    // download downstream must not leave the token redeemable.
    let descriptor = LinkService::redeem(&state.db, &token).await?;

    let (file, len) = state.storage.open(&descriptor.file_path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let fallback_name = descriptor.file_name.replace(['"', '\\'], "_");
    let encoded_name = utf8_percent_encode(&descriptor.file_name, NON_ALPHANUMERIC);

    let headers = [
        (header::CONTENT_TYPE, descriptor.mime_type.clone()),
        (header::CONTENT_LENGTH, len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "inline; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        ),
        (
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate".to_string(),
        ),
    ];

    Ok((headers, body).into_response())
}
