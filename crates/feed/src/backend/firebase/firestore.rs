//! Firestore document client
//!
//! Reads go through `documents:runQuery` with a structured query; inserts
//! POST to the collection and let Firestore assign the id. Field values use
//! Firestore's typed JSON encoding (`stringValue`, `timestampValue`).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{check_status, FirebaseApp};
use crate::access::Session;
use crate::backend::{Direction, DocumentStore, Query};
use crate::error::{FeedError, Result};
use crate::model::{Document, FieldValue, Fields};

pub struct FirestoreClient {
    app: Arc<FirebaseApp>,
}

impl FirestoreClient {
    pub fn new(app: Arc<FirebaseApp>) -> Self {
        Self { app }
    }

    fn documents_root(&self) -> String {
        let config = self.app.config();
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            config.firestore_base(),
            config.project_id
        )
    }

    fn key_param(&self) -> String {
        format!("key={}", urlencoding::encode(&self.app.config().api_key))
    }
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryEntry {
    document: Option<WireDocument>,
}

pub(crate) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
    }
}

/// Decode a typed value. Types the feed never writes come back as `None`.
pub(crate) fn decode_value(value: &Value) -> Option<FieldValue> {
    if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        return Some(FieldValue::String(s.to_string()));
    }
    value
        .get("timestampValue")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    json!({ "fields": encoded })
}

fn decode_document(wire: WireDocument) -> Document {
    let id = wire
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut fields = Fields::new();
    for (name, value) in &wire.fields {
        match decode_value(value) {
            Some(v) => {
                fields.insert(name.clone(), v);
            }
            None => debug!("[Firestore] skipping unsupported field {} on {}", name, id),
        }
    }
    Document { id, fields }
}

pub(crate) fn structured_query(query: &Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": query.collection }],
    });
    if let Some(order) = &query.order_by {
        let direction = match order.direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured["orderBy"] = json!([{
            "field": { "fieldPath": order.field },
            "direction": direction,
        }]);
    }
    json!({ "structuredQuery": structured })
}

/// Parse a `runQuery` response body. Entries without a document (the
/// read-time marker of an empty result) are dropped.
pub(crate) fn parse_run_query(body: Value) -> Result<Vec<Document>> {
    let entries: Vec<RunQueryEntry> = serde_json::from_value(body)?;
    Ok(entries
        .into_iter()
        .filter_map(|e| e.document)
        .map(decode_document)
        .collect())
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let url = format!("{}:runQuery?{}", self.documents_root(), self.key_param());
        debug!("[Firestore] runQuery on {}", query.collection);

        let resp = self
            .app
            .http()
            .post(&url)
            .json(&structured_query(query))
            .send()
            .await?;
        let body: Value = check_status(resp).await?.json().await?;
        parse_run_query(body)
    }

    async fn add(&self, session: &Session, collection: &str, fields: Fields) -> Result<String> {
        let url = format!(
            "{}/{}?{}",
            self.documents_root(),
            urlencoding::encode(collection),
            self.key_param()
        );

        let mut request = self.app.http().post(&url).json(&encode_fields(&fields));
        match session.id_token() {
            Some(token) => request = request.bearer_auth(token),
            None => warn!("[Firestore] writing to {} without credentials", collection),
        }

        let resp = request.send().await?;
        let wire: WireDocument = check_status(resp).await?.json().await?;
        let doc = decode_document(wire);
        if doc.id.is_empty() {
            return Err(FeedError::Backend("Firestore returned a document without a name".to_string()));
        }
        Ok(doc.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::post_fields;
    use crate::model::ContentBody;
    use chrono::TimeZone;

    #[test]
    fn test_value_codec() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
        let encoded = encode_value(&FieldValue::Timestamp(ts));
        assert_eq!(encoded["timestampValue"], "2024-03-09T08:30:00.000000Z");
        assert_eq!(decode_value(&encoded), Some(FieldValue::Timestamp(ts)));

        let encoded = encode_value(&FieldValue::from("hi"));
        assert_eq!(encoded, json!({ "stringValue": "hi" }));
        assert_eq!(decode_value(&json!({ "integerValue": "3" })), None);
    }

    #[test]
    fn test_encode_post_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
        let body = encode_fields(&post_fields(
            "Hello",
            &ContentBody::Text {
                body: "World".to_string(),
            },
            ts,
        ));
        assert_eq!(body["fields"]["type"]["stringValue"], "text");
        assert_eq!(body["fields"]["content"]["stringValue"], "World");
        assert!(body["fields"]["date"]["timestampValue"].is_string());
    }

    #[test]
    fn test_structured_query_orders_by_date() {
        let query = Query::collection("posts").order_by("date", Direction::Descending);
        let body = structured_query(&query);
        assert_eq!(body["structuredQuery"]["from"][0]["collectionId"], "posts");
        assert_eq!(
            body["structuredQuery"]["orderBy"][0]["field"]["fieldPath"],
            "date"
        );
        assert_eq!(
            body["structuredQuery"]["orderBy"][0]["direction"],
            "DESCENDING"
        );
    }

    #[test]
    fn test_parse_run_query() {
        let body = json!([
            {
                "document": {
                    "name": "projects/site/databases/(default)/documents/posts/AbC123",
                    "fields": {
                        "title": { "stringValue": "Hello" },
                        "type": { "stringValue": "video" },
                        "videoUrl": { "stringValue": "https://youtu.be/x" },
                        "date": { "timestampValue": "2024-03-09T08:30:00.123Z" }
                    },
                    "createTime": "2024-03-09T08:30:00.200Z"
                },
                "readTime": "2024-03-10T00:00:00Z"
            }
        ]);

        let docs = parse_run_query(body).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "AbC123");
        assert_eq!(docs[0].get("title"), Some(&FieldValue::from("Hello")));
        assert!(docs[0].get("date").and_then(FieldValue::as_timestamp).is_some());
    }

    #[test]
    fn test_parse_empty_run_query() {
        let docs = parse_run_query(json!([{ "readTime": "2024-03-10T00:00:00Z" }])).unwrap();
        assert!(docs.is_empty());
    }
}
