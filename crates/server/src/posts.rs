//! Posts API
//!
//! Thin HTTP layer over `ContentStore`. Creates by non-admins answer 403;
//! backend failures answer 502.

use crate::auth::CurrentSession;
use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logbook_feed::{CreateOutcome, FeedSnapshot, UploadFile};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct TextPostRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPostRequest {
    pub title: String,
    pub media_url: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

fn created(outcome: CreateOutcome) -> Result<Response> {
    match outcome {
        CreateOutcome::Created { id } => {
            Ok((StatusCode::CREATED, Json(CreatedResponse { id })).into_response())
        }
        CreateOutcome::NotPermitted => Err(Error::Forbidden),
    }
}

/// GET /api/posts
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<FeedSnapshot>> {
    state.store.fetch_all().await?;
    Ok(Json(state.store.snapshot()))
}

/// POST /api/posts/text
pub async fn create_text_post(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<TextPostRequest>,
) -> Result<Response> {
    info!("POST /api/posts/text - {}", req.title);
    let outcome = state
        .store
        .create_text_post(&session, &req.title, &req.body)
        .await?;
    created(outcome)
}

/// POST /api/posts/video
pub async fn create_video_post(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<VideoPostRequest>,
) -> Result<Response> {
    info!("POST /api/posts/video - {}", req.title);
    let outcome = state
        .store
        .create_video_post(&session, &req.title, &req.media_url)
        .await?;
    created(outcome)
}

/// POST /api/posts/pdf
///
/// Multipart form with a `title` text field and a `file` part.
pub async fn create_pdf_post(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut title = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        Error::BadRequest(format!("Invalid multipart body: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "title" => {
                title = Some(field.text().await.map_err(|e| {
                    Error::BadRequest(format!("Failed to read title: {}", e))
                })?);
            }
            "file" => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .ok_or_else(|| Error::BadRequest("File part has no file name".to_string()))?;
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    error!("Failed to read file data: {}", e);
                    Error::BadRequest(format!("Failed to read file: {}", e))
                })?;

                let mut upload = UploadFile::new(filename, data);
                upload.content_type = content_type;
                file = Some(upload);
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| Error::BadRequest("Missing 'title' field".to_string()))?;
    let file = file.ok_or_else(|| Error::BadRequest("Missing 'file' part".to_string()))?;

    info!(
        "POST /api/posts/pdf - {} ({}, {} bytes)",
        title,
        file.name,
        file.data.len()
    );
    let outcome = state.store.create_pdf_post(&session, &title, &file).await?;
    created(outcome)
}
