//! Router
//!
//! Pages, posts API, session lookup and (memory mode) blob routes, all
//! behind the session middleware.

use crate::auth::{self, middleware::mw_resolve_session};
use crate::config::AppState;
use crate::{blobs, pages, posts};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new();

    for route in pages::ROUTES {
        app = app.route(route.path, get(pages::serve_page));
    }

    app = app
        .route("/auth/me", get(auth::me))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/text", post(posts::create_text_post))
        .route("/api/posts/video", post(posts::create_video_post))
        .route(
            "/api/posts/pdf",
            post(posts::create_pdf_post).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/health", get(health_check));

    if state.memory_blobs.is_some() {
        app = app.route("/blobs/{*path}", get(blobs::get_blob));
    }

    app.fallback_service(ServeDir::new(&state.static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw_resolve_session,
        ))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK - Logbook Server"
}
