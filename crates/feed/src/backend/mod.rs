//! Backend client abstractions
//!
//! The content store talks to three managed services: a document database,
//! a blob store and an identity provider. Each is a trait so the store can
//! run against the hosted Firebase services or the in-memory doubles.

pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::access::{Identity, Session};
use crate::error::Result;
use crate::model::{Document, Fields, UploadFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A whole-collection read, optionally ordered by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Document database: collection reads and inserts.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Insert a new document and return its backend-assigned id.
    async fn add(&self, session: &Session, collection: &str, fields: Fields) -> Result<String>;
}

/// Blob store: path-keyed uploads with resolvable download locations.
#[async_trait]
pub trait BlobStorage: Send + Sync + 'static {
    /// Store `file` at `path`, replacing whatever was there.
    async fn upload(&self, session: &Session, path: &str, file: &UploadFile) -> Result<()>;

    /// Resolve a download location for a stored blob.
    async fn download_url(&self, session: &Session, path: &str) -> Result<String>;
}

/// Hosted authentication: resolves a bearer credential to an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn resolve(&self, token: &str) -> Result<Identity>;
}

/// Explicitly constructed client context handed to the store.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStorage>,
}

impl Backend {
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { documents, blobs }
    }
}
