use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use logbook_feed::Session;
use tracing::{debug, warn};

/// Resolve `Authorization: Bearer <id token>` into a `Session`.
///
/// No header means an anonymous session. A malformed header or a token the
/// identity provider rejects fails the request with 401; an unreachable
/// identity provider fails it with 502.
pub async fn mw_resolve_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let session = match req.headers().get(header::AUTHORIZATION) {
        None => Session::anonymous(),
        Some(value) => {
            let value = value.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?;

            // Format: "Bearer <token>"
            let token = value
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(Error::AuthFailTokenWrongFormat)?;

            let identity = state.identity.resolve(token).await.map_err(|e| {
                warn!("Could not resolve ID token: {}", e);
                Error::from(e)
            })?;
            debug!("MIDDLEWARE: session for {}", identity.uid);
            Session::authenticated(identity)
        }
    };

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
