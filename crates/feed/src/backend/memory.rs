//! In-memory backend
//!
//! Process-local stand-ins for the hosted services. Used by tests and by
//! the server's `memory` mode for local development. Each store counts its
//! calls and can be told to fail its next call.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::debug;
use uuid::Uuid;

use super::{BlobStorage, Direction, DocumentStore, IdentityProvider, Query};
use crate::access::{Identity, Session};
use crate::error::{FeedError, Result};
use crate::model::{Document, Fields, UploadFile};

/// Document database kept in insertion order per collection.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    queries: AtomicUsize,
    adds: AtomicUsize,
    fail_next_query: Mutex<Option<String>>,
    fail_next_add: Mutex<Option<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing the `add` counter.
    pub fn insert(&self, collection: &str, fields: Fields) -> String {
        let id = Uuid::new_v4().to_string();
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        id
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    pub fn add_count(&self) -> usize {
        self.adds.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_next_query(&self, message: impl Into<String>) {
        *self.fail_next_query.lock() = Some(message.into());
    }

    pub fn fail_next_add(&self, message: impl Into<String>) {
        *self.fail_next_add.lock() = Some(message.into());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = self.fail_next_query.lock().take() {
            return Err(FeedError::Backend(message));
        }

        let mut docs = self
            .collections
            .read()
            .get(&query.collection)
            .cloned()
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            // Documents without the ordering field drop out of ordered queries.
            docs.retain(|d| d.fields.contains_key(&order.field));
            // Stable sort: ties keep insertion order.
            docs.sort_by(|a, b| {
                let ord = a
                    .fields
                    .get(&order.field)
                    .cmp(&b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        debug!("[memory] query {} -> {} docs", query.collection, docs.len());
        Ok(docs)
    }

    async fn add(&self, _session: &Session, collection: &str, fields: Fields) -> Result<String> {
        self.adds.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = self.fail_next_add.lock().take() {
            return Err(FeedError::Backend(message));
        }
        Ok(self.insert(collection, fields))
    }
}

/// A blob held by `MemoryBlobStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

/// Path-keyed blob store. Download URLs point at `{base_url}/blobs/{path}`.
pub struct MemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<String, StoredBlob>>,
    uploads: AtomicUsize,
    fail_next_upload: Mutex<Option<String>>,
    fail_next_download_url: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            fail_next_upload: Mutex::new(None),
            fail_next_download_url: Mutex::new(None),
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.read().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.read().contains_key(path)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_next_upload(&self, message: impl Into<String>) {
        *self.fail_next_upload.lock() = Some(message.into());
    }

    pub fn fail_next_download_url(&self, message: impl Into<String>) {
        *self.fail_next_download_url.lock() = Some(message.into());
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStore {
    async fn upload(&self, _session: &Session, path: &str, file: &UploadFile) -> Result<()> {
        self.uploads.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = self.fail_next_upload.lock().take() {
            return Err(FeedError::Backend(message));
        }

        self.blobs.write().insert(
            path.to_string(),
            StoredBlob {
                data: file.data.clone(),
                content_type: file.content_type_or_default().to_string(),
            },
        );
        debug!("[memory] stored blob {} ({} bytes)", path, file.data.len());
        Ok(())
    }

    async fn download_url(&self, _session: &Session, path: &str) -> Result<String> {
        if let Some(message) = self.fail_next_download_url.lock().take() {
            return Err(FeedError::Backend(message));
        }
        if !self.contains(path) {
            return Err(FeedError::Backend(format!("no blob at {}", path)));
        }
        Ok(format!("{}/blobs/{}", self.base_url, path))
    }
}

/// Identity provider backed by a fixed token → email table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }

    /// Parse `token=email` pairs separated by commas.
    pub fn parse(table: &str) -> Result<Self> {
        let mut provider = Self::new();
        for pair in table.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (token, email) = pair
                .split_once('=')
                .ok_or_else(|| FeedError::Config(format!("expected token=email, got '{}'", pair)))?;
            provider = provider.with_token(token.trim(), email.trim());
        }
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let email = self
            .tokens
            .get(token)
            .ok_or_else(|| FeedError::Identity("unknown token".to_string()))?;
        Ok(Identity::new(
            format!("static-{}", email),
            Some(email.clone()),
            token,
        ))
    }
}
