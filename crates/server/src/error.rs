use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logbook_feed::FeedError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum Error {
    // Auth Errors
    AuthFailTokenWrongFormat,
    AuthFailInvalidToken,
    AuthFailSessionNotInRequestExt,
    Forbidden,

    // Generic
    NotFound,
    BadRequest(String),
    /// The managed backend failed or refused the call.
    Backend(String),
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::AuthFailTokenWrongFormat => (
                StatusCode::UNAUTHORIZED,
                "Auth token wrong format".to_string(),
            ),
            Error::AuthFailInvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Auth token rejected".to_string(),
            ),
            Error::AuthFailSessionNotInRequestExt => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session missing".to_string(),
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                "Only administrators can create posts".to_string(),
            ),
            Error::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Backend(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

impl From<FeedError> for Error {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Identity(_) => Error::AuthFailInvalidToken,
            FeedError::Config(msg) => Error::Internal(msg),
            other => Error::Backend(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
