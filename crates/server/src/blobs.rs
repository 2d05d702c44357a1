//! Blob serving for memory mode
//!
//! With the hosted backend, download URLs point at Cloud Storage directly.
//! In memory mode they point back here.

use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::info;

/// GET /blobs/{*path}
pub async fn get_blob(
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Bytes)> {
    info!("GET /blobs/{}", path);

    let blob = state
        .memory_blobs
        .as_ref()
        .and_then(|blobs| blobs.get(&path))
        .ok_or(Error::NotFound)?;

    let mut hasher = Sha256::new();
    hasher.update(&blob.data);
    let etag = format!("\"{:x}\"", hasher.finalize());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }

    Ok((headers, blob.data))
}
