use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use async_trait::async_trait;
use logbook_feed::backend::memory::{MemoryBlobStore, MemoryDocumentStore, StaticIdentityProvider};
use logbook_feed::model::POSTS_COLLECTION;
use logbook_feed::{AdminList, FeedError, Identity, IdentityProvider};
use logbook_server::config::{AppState, ServerConfig};
use logbook_server::router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;

const ADMIN: &str = "osalirab@gmail.com";
const ADMIN_TOKEN: &str = "admin-token";
const GUEST_TOKEN: &str = "guest-token";
const WRONG_CASE_TOKEN: &str = "wrong-case-token";

struct TestSite {
    app: Router,
    docs: Arc<MemoryDocumentStore>,
    blobs: Arc<MemoryBlobStore>,
    _static_dir: TempDir,
}

fn site() -> TestSite {
    site_with(|state| state)
}

fn site_with(customize: impl FnOnce(AppState) -> AppState) -> TestSite {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        static_dir.path().join("index.html"),
        "<html><body>logbook shell</body></html>",
    )
    .unwrap();

    let config = ServerConfig {
        static_dir: static_dir.path().to_path_buf(),
        admins: AdminList::new([ADMIN]),
        ..ServerConfig::default()
    };
    let identity = StaticIdentityProvider::new()
        .with_token(ADMIN_TOKEN, ADMIN)
        .with_token(GUEST_TOKEN, "guest@example.com")
        .with_token(WRONG_CASE_TOKEN, "Osalirab@gmail.com");

    let docs = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new(config.public_url.clone()));
    let state = AppState::with_memory_stores(&config, docs.clone(), blobs.clone(), identity);

    TestSite {
        app: router(customize(state)),
        docs,
        blobs,
        _static_dir: static_dir,
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = assert_ok!(app.clone().oneshot(req).await);
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, req).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn pdf_upload(token: &str, title: Option<&str>, file_name: &str, data: &str) -> Request<Body> {
    let boundary = "logbook-test-boundary";
    let mut body = String::new();
    if let Some(title) = title {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{t}\r\n",
            b = boundary,
            t = title
        ));
    }
    body.push_str(&format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/pdf\r\n\r\n{d}\r\n--{b}--\r\n",
        b = boundary,
        f = file_name,
        d = data
    ));

    Request::builder()
        .method("POST")
        .uri("/api/posts/pdf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_and_pages() {
    let site = site();

    let (status, body) = send(&site.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).starts_with("OK"));

    for path in ["/", "/posts", "/logbook", "/proposal", "/updates", "/demo", "/report"] {
        let (status, body) = send(&site.app, get(path, None)).await;
        assert_eq!(status, StatusCode::OK, "page {}", path);
        assert!(String::from_utf8_lossy(&body).contains("logbook shell"));
    }

    let (status, _) = send(&site.app, get("/no-such-page", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_lookup() {
    let site = site();

    let (status, me) = send_json(&site.app, get("/auth/me", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["authenticated"], false);
    assert_eq!(me["isAdmin"], false);

    let (_, me) = send_json(&site.app, get("/auth/me", Some(ADMIN_TOKEN))).await;
    assert_eq!(me["email"], ADMIN);
    assert_eq!(me["isAdmin"], true);

    let (_, me) = send_json(&site.app, get("/auth/me", Some(WRONG_CASE_TOKEN))).await;
    assert_eq!(me["authenticated"], true);
    assert_eq!(me["isAdmin"], false);

    let (status, err) = send_json(&site.app, get("/auth/me", Some("forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(err["error"]["message"].is_string());

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&site.app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_creates_text_post() {
    let site = site();

    let (status, created) = send_json(
        &site.app,
        post_json(
            "/api/posts/text",
            Some(ADMIN_TOKEN),
            json!({ "title": "Hello", "body": "World" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, feed) = send_json(&site.app, get("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["loading"], false);
    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id.as_str());
    assert_eq!(items[0]["kind"], "text");
    assert_eq!(items[0]["title"], "Hello");
    assert_eq!(items[0]["body"], "World");
    assert!(items[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_non_admin_writes_are_refused() {
    let site = site();

    for token in [None, Some(GUEST_TOKEN), Some(WRONG_CASE_TOKEN)] {
        let (status, _) = send_json(
            &site.app,
            post_json(
                "/api/posts/video",
                token,
                json!({ "title": "Clip", "mediaUrl": "https://youtu.be/x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = send(
        &site.app,
        pdf_upload(GUEST_TOKEN, Some("Report"), "report.pdf", "%PDF-1.7"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(site.docs.add_count(), 0);
    assert_eq!(site.blobs.upload_count(), 0);
    assert_eq!(site.docs.len(POSTS_COLLECTION), 0);
}

#[tokio::test]
async fn test_admin_uploads_pdf() {
    let site = site();

    let (status, _) = send(
        &site.app,
        pdf_upload(ADMIN_TOKEN, Some("Report"), "report.pdf", "%PDF-1.7 body"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(site.blobs.contains("pdfs/report.pdf"));

    let (_, feed) = send_json(&site.app, get("/api/posts", None)).await;
    let item = &feed["items"][0];
    assert_eq!(item["kind"], "pdf");
    let file_url = item["fileUrl"].as_str().unwrap();
    assert!(file_url.ends_with("/blobs/pdfs/report.pdf"));

    let resp = assert_ok!(
        site.app
            .clone()
            .oneshot(get("/blobs/pdfs/report.pdf", None))
            .await
    );
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(resp.headers().contains_key(header::ETAG));
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"%PDF-1.7 body");
}

#[tokio::test]
async fn test_pdf_upload_requires_title() {
    let site = site();

    let (status, err) = send_json(
        &site.app,
        pdf_upload(ADMIN_TOKEN, None, "report.pdf", "%PDF"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "Missing 'title' field");
    assert_eq!(site.blobs.upload_count(), 0);
}

#[tokio::test]
async fn test_feed_failure_reports_bad_gateway() {
    let site = site();

    let (status, _) = send_json(
        &site.app,
        post_json(
            "/api/posts/video",
            Some(ADMIN_TOKEN),
            json!({ "title": "Demo", "mediaUrl": "https://youtu.be/demo" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    site.docs.fail_next_query("firestore unavailable");
    let (status, err) = send_json(&site.app, get("/api/posts", None)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(err["error"]["message"]
        .as_str()
        .unwrap()
        .contains("firestore unavailable"));

    let (status, feed) = send_json(&site.app, get("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["items"][0]["mediaUrl"], "https://youtu.be/demo");
}

#[tokio::test]
async fn test_pdf_upload_requires_file_name() {
    let site = site();

    let (status, err) = send_json(
        &site.app,
        pdf_upload(ADMIN_TOKEN, Some("Report"), "", "%PDF"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "File part has no file name");
    assert_eq!(site.blobs.upload_count(), 0);
    assert_eq!(site.docs.add_count(), 0);
}

#[tokio::test]
async fn test_admin_post_survives_refresh_failure() {
    let site = site();
    site.docs.fail_next_query("firestore unavailable");

    let (status, created) = send_json(
        &site.app,
        post_json(
            "/api/posts/text",
            Some(ADMIN_TOKEN),
            json!({ "title": "Hello", "body": "World" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());
    assert_eq!(site.docs.len(POSTS_COLLECTION), 1);
}

struct UnreachableIdentity;

#[async_trait]
impl IdentityProvider for UnreachableIdentity {
    async fn resolve(&self, _token: &str) -> logbook_feed::Result<Identity> {
        Err(FeedError::Backend("identity toolkit unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_identity_outage_reports_bad_gateway() {
    let site = site_with(|mut state| {
        state.identity = Arc::new(UnreachableIdentity);
        state
    });

    let (status, err) = send_json(&site.app, get("/api/posts", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(err["error"]["message"]
        .as_str()
        .unwrap()
        .contains("identity toolkit unreachable"));

    let (status, _) = send_json(&site.app, get("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_blob_is_not_found() {
    let site = site();
    let (status, _) = send(&site.app, get("/blobs/pdfs/none.pdf", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
