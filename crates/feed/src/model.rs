//! Feed data model
//!
//! `ContentItem` is the in-process view of one post. `Document` is the raw
//! shape a document database hands back; the two convert through the
//! `posts` collection schema (`title`, `type`, `date` and one of
//! `content` / `pdfUrl` / `videoUrl`).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FeedError;

/// Collection holding every post.
pub const POSTS_COLLECTION: &str = "posts";

/// Field names of the `posts` collection schema.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const TYPE: &str = "type";
    pub const DATE: &str = "date";
    pub const CONTENT: &str = "content";
    pub const PDF_URL: &str = "pdfUrl";
    pub const VIDEO_URL: &str = "videoUrl";
}

/// Kind of a post, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Pdf,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Pdf => "pdf",
            ContentKind::Video => "video",
        }
    }

    /// Document field carrying the payload for this kind.
    pub fn payload_field(&self) -> &'static str {
        match self {
            ContentKind::Text => fields::CONTENT,
            ContentKind::Pdf => fields::PDF_URL,
            ContentKind::Video => fields::VIDEO_URL,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "pdf" => Ok(ContentKind::Pdf),
            "video" => Ok(ContentKind::Video),
            other => Err(format!("unknown post type '{}'", other)),
        }
    }
}

/// Payload of a post. Exactly one variant, matching the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentBody {
    Text {
        body: String,
    },
    Pdf {
        #[serde(rename = "fileUrl")]
        file_url: String,
    },
    Video {
        #[serde(rename = "mediaUrl")]
        media_url: String,
    },
}

impl ContentBody {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentBody::Text { .. } => ContentKind::Text,
            ContentBody::Pdf { .. } => ContentKind::Pdf,
            ContentBody::Video { .. } => ContentKind::Video,
        }
    }

    fn payload(&self) -> &str {
        match self {
            ContentBody::Text { body } => body,
            ContentBody::Pdf { file_url } => file_url,
            ContentBody::Video { media_url } => media_url,
        }
    }

    fn from_payload(kind: ContentKind, payload: String) -> Self {
        match kind {
            ContentKind::Text => ContentBody::Text { body: payload },
            ContentKind::Pdf => ContentBody::Pdf { file_url: payload },
            ContentKind::Video => ContentBody::Video { media_url: payload },
        }
    }
}

/// One entry of the posts feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub content: ContentBody,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }

    pub fn body(&self) -> Option<&str> {
        match &self.content {
            ContentBody::Text { body } => Some(body),
            _ => None,
        }
    }

    pub fn file_url(&self) -> Option<&str> {
        match &self.content {
            ContentBody::Pdf { file_url } => Some(file_url),
            _ => None,
        }
    }

    pub fn media_url(&self) -> Option<&str> {
        match &self.content {
            ContentBody::Video { media_url } => Some(media_url),
            _ => None,
        }
    }
}

/// A typed document field value.
///
/// Ordering compares values of the same variant naturally; mixed variants
/// order by variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    String(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

/// A stored document with its backend-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

/// Build the document fields for a new post.
pub fn post_fields(title: &str, content: &ContentBody, date: DateTime<Utc>) -> Fields {
    let kind = content.kind();
    let mut fields = Fields::new();
    fields.insert(fields::TITLE.to_string(), title.into());
    fields.insert(fields::TYPE.to_string(), kind.as_str().into());
    fields.insert(fields::DATE.to_string(), date.into());
    fields.insert(kind.payload_field().to_string(), content.payload().into());
    fields
}

impl TryFrom<Document> for ContentItem {
    type Error = FeedError;

    fn try_from(mut doc: Document) -> Result<Self, Self::Error> {
        let id = doc.id.clone();
        let mut take_string = |field: &str| -> Result<String, FeedError> {
            match doc.fields.remove(field) {
                Some(FieldValue::String(s)) => Ok(s),
                Some(_) => Err(FeedError::invalid_document(
                    &id,
                    format!("field '{}' is not a string", field),
                )),
                None => Err(FeedError::invalid_document(
                    &id,
                    format!("missing field '{}'", field),
                )),
            }
        };

        let title = take_string(fields::TITLE)?;
        let kind: ContentKind = take_string(fields::TYPE)?
            .parse()
            .map_err(|e: String| FeedError::invalid_document(&id, e))?;
        let payload = take_string(kind.payload_field())?;

        let created_at = doc
            .fields
            .get(fields::DATE)
            .and_then(FieldValue::as_timestamp)
            .ok_or_else(|| FeedError::invalid_document(&id, "missing timestamp 'date'"))?;

        Ok(ContentItem {
            id: doc.id,
            title,
            content: ContentBody::from_payload(kind, payload),
            created_at,
        })
    }
}

/// A binary handed over for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name; also the storage key under `pdfs/`.
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}
