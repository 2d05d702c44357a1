//! Content store
//!
//! Holds the last fetched posts list and a loading flag, and is the only
//! path through which posts are written. Writes are gated on the caller's
//! session being on the admin allow-list; every successful write refetches
//! the whole collection instead of patching the local list.
//!
//! Operations do not exclude each other. Two overlapping fetches race and
//! the list ends up as whichever response landed last.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::access::{AdminList, Session};
use crate::backend::{Backend, Direction, Query};
use crate::error::Result;
use crate::model::{fields, post_fields, ContentBody, ContentItem, ContentKind, UploadFile, POSTS_COLLECTION};

/// Prefix under which uploaded PDFs are stored.
pub const PDF_PREFIX: &str = "pdfs";

const EVENT_CAPACITY: usize = 64;

/// Change notifications emitted by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedEvent {
    LoadingStarted,
    Refreshed { count: usize },
    RefreshFailed { message: String },
    Created { id: String, kind: ContentKind },
}

/// Result of a create call that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { id: String },
    /// Caller is not an administrator; nothing was written.
    NotPermitted,
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created { .. })
    }
}

/// Point-in-time copy of the store state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    pub items: Vec<ContentItem>,
    pub loading: bool,
}

#[derive(Default)]
struct FeedState {
    items: Vec<ContentItem>,
    loading: bool,
}

pub struct ContentStore {
    backend: Backend,
    admins: AdminList,
    state: RwLock<FeedState>,
    events: broadcast::Sender<FeedEvent>,
}

/// Clears the loading flag however the fetch ends.
struct LoadingGuard<'a> {
    store: &'a ContentStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.state.write().loading = false;
    }
}

/// Storage path for an uploaded PDF, keyed by its own file name.
pub fn pdf_path(file_name: &str) -> String {
    format!("{}/{}", PDF_PREFIX, file_name)
}

impl ContentStore {
    pub fn new(backend: Backend, admins: AdminList) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            admins,
            state: RwLock::new(FeedState::default()),
            events,
        }
    }

    pub fn admins(&self) -> &AdminList {
        &self.admins
    }

    /// True iff the session's email is on the allow-list.
    pub fn is_admin(&self, session: &Session) -> bool {
        self.admins.is_admin(session)
    }

    pub fn items(&self) -> Vec<ContentItem> {
        self.state.read().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.read();
        FeedSnapshot {
            items: state.items.clone(),
            loading: state.loading,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: FeedEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Replace the list with every post, newest first.
    ///
    /// On failure the previous list is kept and the error is returned.
    /// Documents that do not form a valid post are skipped.
    pub async fn fetch_all(&self) -> Result<()> {
        self.state.write().loading = true;
        let guard = LoadingGuard { store: self };
        self.notify(FeedEvent::LoadingStarted);

        let query = Query::collection(POSTS_COLLECTION).order_by(fields::DATE, Direction::Descending);
        let docs = match self.backend.documents.query(&query).await {
            Ok(docs) => docs,
            Err(e) => {
                error!("Error fetching posts: {}", e);
                drop(guard);
                self.notify(FeedEvent::RefreshFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let items: Vec<ContentItem> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match ContentItem::try_from(doc) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!("Skipping post {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        let count = items.len();
        self.state.write().items = items;
        drop(guard);

        debug!("Fetched {} posts", count);
        self.notify(FeedEvent::Refreshed { count });
        Ok(())
    }

    pub async fn create_text_post(
        &self,
        session: &Session,
        title: &str,
        body: &str,
    ) -> Result<CreateOutcome> {
        if !self.is_admin(session) {
            debug!("Ignoring text post from non-admin session");
            return Ok(CreateOutcome::NotPermitted);
        }

        self.write_post(
            session,
            title,
            ContentBody::Text {
                body: body.to_string(),
            },
        )
        .await
    }

    /// Upload `file` to `pdfs/{file name}` and post its download URL.
    ///
    /// An existing object with the same name is overwritten. If the upload
    /// succeeds but the post write fails, the uploaded object stays behind.
    pub async fn create_pdf_post(
        &self,
        session: &Session,
        title: &str,
        file: &UploadFile,
    ) -> Result<CreateOutcome> {
        if !self.is_admin(session) {
            debug!("Ignoring PDF post from non-admin session");
            return Ok(CreateOutcome::NotPermitted);
        }

        let path = pdf_path(&file.name);
        let blobs = &self.backend.blobs;

        if let Err(e) = blobs.upload(session, &path, file).await {
            error!("Error uploading {}: {}", path, e);
            return Err(e);
        }
        let file_url = match blobs.download_url(session, &path).await {
            Ok(url) => url,
            Err(e) => {
                error!("Error resolving download URL for {}: {}", path, e);
                return Err(e);
            }
        };

        self.write_post(session, title, ContentBody::Pdf { file_url })
            .await
    }

    /// Post an external media link. Nothing is uploaded.
    pub async fn create_video_post(
        &self,
        session: &Session,
        title: &str,
        media_url: &str,
    ) -> Result<CreateOutcome> {
        if !self.is_admin(session) {
            debug!("Ignoring video post from non-admin session");
            return Ok(CreateOutcome::NotPermitted);
        }

        self.write_post(
            session,
            title,
            ContentBody::Video {
                media_url: media_url.to_string(),
            },
        )
        .await
    }

    async fn write_post(
        &self,
        session: &Session,
        title: &str,
        content: ContentBody,
    ) -> Result<CreateOutcome> {
        let kind = content.kind();
        let fields = post_fields(title, &content, Utc::now());

        let id = match self
            .backend
            .documents
            .add(session, POSTS_COLLECTION, fields)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!("Error adding {} post: {}", kind, e);
                return Err(e);
            }
        };

        info!("Created {} post {}", kind, id);
        self.notify(FeedEvent::Created {
            id: id.clone(),
            kind,
        });

        // The post is stored; a failed refresh only leaves the list stale.
        if let Err(e) = self.fetch_all().await {
            warn!("Refresh after creating post {} failed: {}", id, e);
        }
        Ok(CreateOutcome::Created { id })
    }
}
