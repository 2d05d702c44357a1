//! Firebase REST backend
//!
//! Talks to Firestore, Cloud Storage for Firebase and the Identity Toolkit
//! over their public REST APIs. Each service can be pointed at a local
//! emulator through the standard `*_EMULATOR_HOST` variables.

pub mod firestore;
pub mod identity;
pub mod storage;

pub use firestore::FirestoreClient;
pub use identity::FirebaseIdentityProvider;
pub use storage::FirebaseStorageClient;

use std::sync::Arc;
use tracing::info;

use crate::error::{FeedError, Result};

pub const ENV_API_KEY: &str = "FIREBASE_API_KEY";
pub const ENV_AUTH_DOMAIN: &str = "FIREBASE_AUTH_DOMAIN";
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
pub const ENV_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
pub const ENV_MESSAGING_SENDER_ID: &str = "FIREBASE_MESSAGING_SENDER_ID";
pub const ENV_APP_ID: &str = "FIREBASE_APP_ID";

pub const ENV_FIRESTORE_EMULATOR: &str = "FIRESTORE_EMULATOR_HOST";
pub const ENV_STORAGE_EMULATOR: &str = "FIREBASE_STORAGE_EMULATOR_HOST";
pub const ENV_AUTH_EMULATOR: &str = "FIREBASE_AUTH_EMULATOR_HOST";

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com";
const STORAGE_HOST: &str = "https://firebasestorage.googleapis.com";
const IDENTITY_HOST: &str = "https://identitytoolkit.googleapis.com";

/// Web app configuration of a Firebase project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    /// `host:port` of a Firestore emulator
    pub firestore_emulator: Option<String>,
    /// `host:port` of a Storage emulator
    pub storage_emulator: Option<String>,
    /// `host:port` of an Auth emulator
    pub auth_emulator: Option<String>,
}

impl FirebaseConfig {
    /// Load from the process environment. Every project value is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| FeedError::Config(format!("{} is not set", key)))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key: required(ENV_API_KEY)?,
            auth_domain: required(ENV_AUTH_DOMAIN)?,
            project_id: required(ENV_PROJECT_ID)?,
            storage_bucket: required(ENV_STORAGE_BUCKET)?,
            messaging_sender_id: required(ENV_MESSAGING_SENDER_ID)?,
            app_id: required(ENV_APP_ID)?,
            firestore_emulator: optional(ENV_FIRESTORE_EMULATOR),
            storage_emulator: optional(ENV_STORAGE_EMULATOR),
            auth_emulator: optional(ENV_AUTH_EMULATOR),
        })
    }

    pub fn firestore_base(&self) -> String {
        match &self.firestore_emulator {
            Some(host) => format!("http://{}", host),
            None => FIRESTORE_HOST.to_string(),
        }
    }

    pub fn storage_base(&self) -> String {
        match &self.storage_emulator {
            Some(host) => format!("http://{}", host),
            None => STORAGE_HOST.to_string(),
        }
    }

    pub fn identity_base(&self) -> String {
        match &self.auth_emulator {
            Some(host) => format!("http://{}/identitytoolkit.googleapis.com", host),
            None => IDENTITY_HOST.to_string(),
        }
    }
}

/// Initialized project handle shared by the service clients.
pub struct FirebaseApp {
    config: FirebaseConfig,
    http: reqwest::Client,
}

impl FirebaseApp {
    pub fn initialize(config: FirebaseConfig) -> Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("logbook-feed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(
            "[Firebase] project {} (bucket {}){}",
            config.project_id,
            config.storage_bucket,
            if config.firestore_emulator.is_some()
                || config.storage_emulator.is_some()
                || config.auth_emulator.is_some()
            {
                " using emulators"
            } else {
                ""
            }
        );

        Ok(Arc::new(Self { config, http }))
    }

    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Turn a non-success response into `FeedError::Status`.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(FeedError::Status {
        status: status.as_u16(),
        message,
    })
}
