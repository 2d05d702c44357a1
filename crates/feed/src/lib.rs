//! Logbook content feed
//!
//! Posts model, backend clients (Firebase REST and in-memory) and the
//! admin-gated content store that the site server drives.

pub mod access;
pub mod backend;
pub mod error;
pub mod model;
pub mod store;

pub use access::{AdminList, Identity, Session};
pub use backend::{Backend, BlobStorage, DocumentStore, IdentityProvider};
pub use error::{FeedError, Result};
pub use model::{ContentBody, ContentItem, ContentKind, UploadFile};
pub use store::{ContentStore, CreateOutcome, FeedEvent, FeedSnapshot};
