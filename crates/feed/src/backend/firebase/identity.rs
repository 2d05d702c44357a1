//! Identity Toolkit session lookup

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{check_status, FirebaseApp};
use crate::access::Identity;
use crate::backend::IdentityProvider;
use crate::error::{FeedError, Result};

/// Resolves Firebase ID tokens through `accounts:lookup`.
pub struct FirebaseIdentityProvider {
    app: Arc<FirebaseApp>,
}

impl FirebaseIdentityProvider {
    pub fn new(app: Arc<FirebaseApp>) -> Self {
        Self { app }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

fn identity_from_lookup(resp: LookupResponse, token: &str) -> Result<Identity> {
    let user = resp
        .users
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::Identity("token does not belong to any user".to_string()))?;
    Ok(Identity::new(user.local_id, user.email, token))
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let config = self.app.config();
        let url = format!(
            "{}/v1/accounts:lookup?key={}",
            config.identity_base(),
            urlencoding::encode(&config.api_key)
        );

        let resp = self
            .app
            .http()
            .post(&url)
            .json(&json!({ "idToken": token }))
            .send()
            .await?;

        let resp = check_status(resp).await.map_err(|e| match e {
            FeedError::Status { status, .. } if status == 400 => {
                FeedError::Identity("invalid or expired ID token".to_string())
            }
            other => other,
        })?;

        identity_from_lookup(resp.json().await?, token)
    }
}
