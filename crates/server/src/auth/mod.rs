//! Session handling
//!
//! Sign-in happens against the hosted auth provider in the browser; the
//! server only resolves the bearer ID token on each request into a
//! `Session` and exposes who the caller is.

pub mod middleware;

use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{extract::FromRequestParts, extract::State, http::request::Parts, Json};
use logbook_feed::Session;
use serde::Serialize;

/// The request's session, placed in extensions by `mw_resolve_session`.
#[derive(Clone, Debug)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(Error::AuthFailSessionNotInRequestExt)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub authenticated: bool,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<SessionInfo> {
    Json(SessionInfo {
        authenticated: session.identity().is_some(),
        email: session.email().map(str::to_string),
        is_admin: state.store.is_admin(&session),
    })
}
