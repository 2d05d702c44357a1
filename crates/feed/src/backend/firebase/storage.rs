//! Cloud Storage for Firebase client
//!
//! Objects are addressed by their full path (`pdfs/report.pdf`). A download
//! URL is `.../o/{encoded path}?alt=media&token={download token}`, where the
//! token comes from the object's metadata.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{check_status, FirebaseApp};
use crate::access::Session;
use crate::backend::BlobStorage;
use crate::error::{FeedError, Result};
use crate::model::UploadFile;

pub struct FirebaseStorageClient {
    app: Arc<FirebaseApp>,
    /// Download tokens seen on upload, keyed by object path.
    tokens: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn first_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()
            .and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty()))
    }
}

impl FirebaseStorageClient {
    pub fn new(app: Arc<FirebaseApp>) -> Self {
        Self {
            app,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    fn objects_root(&self) -> String {
        let config = self.app.config();
        format!(
            "{}/v0/b/{}/o",
            config.storage_base(),
            config.storage_bucket
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder, session: &Session) -> reqwest::RequestBuilder {
        match session.id_token() {
            Some(token) => request.header(AUTHORIZATION, format!("Firebase {}", token)),
            None => request,
        }
    }

    async fn fetch_metadata(&self, session: &Session, path: &str) -> Result<ObjectMetadata> {
        let url = format!("{}/{}", self.objects_root(), urlencoding::encode(path));
        let resp = self.authorize(self.app.http().get(&url), session).send().await?;
        Ok(check_status(resp).await?.json().await?)
    }
}

pub(crate) fn download_url(objects_root: &str, path: &str, token: &str) -> String {
    format!(
        "{}/{}?alt=media&token={}",
        objects_root,
        urlencoding::encode(path),
        urlencoding::encode(token)
    )
}

#[async_trait]
impl BlobStorage for FirebaseStorageClient {
    async fn upload(&self, session: &Session, path: &str, file: &UploadFile) -> Result<()> {
        let url = format!(
            "{}?uploadType=media&name={}",
            self.objects_root(),
            urlencoding::encode(path)
        );

        let request = self
            .app
            .http()
            .post(&url)
            .header(CONTENT_TYPE, file.content_type_or_default())
            .body(file.data.clone());
        let resp = self.authorize(request, session).send().await?;
        let meta: ObjectMetadata = check_status(resp).await?.json().await?;

        info!("[Storage] uploaded {} ({} bytes)", meta.name, file.data.len());
        if let Some(token) = meta.first_token() {
            self.tokens.write().insert(path.to_string(), token.to_string());
        }
        Ok(())
    }

    async fn download_url(&self, session: &Session, path: &str) -> Result<String> {
        let cached = self.tokens.read().get(path).cloned();
        let token = match cached {
            Some(token) => token,
            None => {
                debug!("[Storage] fetching metadata for {}", path);
                let meta = self.fetch_metadata(session, path).await?;
                let token = meta
                    .first_token()
                    .ok_or_else(|| FeedError::Backend(format!("object {} has no download token", path)))?
                    .to_string();
                self.tokens.write().insert(path.to_string(), token.clone());
                token
            }
        };
        Ok(download_url(&self.objects_root(), path, &token))
    }
}
