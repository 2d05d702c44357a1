//! Site server configuration

use anyhow::{bail, Context};
use logbook_feed::backend::firebase::{
    FirebaseApp, FirebaseConfig, FirebaseIdentityProvider, FirebaseStorageClient, FirestoreClient,
};
use logbook_feed::backend::memory::{MemoryBlobStore, MemoryDocumentStore, StaticIdentityProvider};
use logbook_feed::{AdminList, Backend, ContentStore, IdentityProvider};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const ENV_BIND_ADDR: &str = "SITE_BIND_ADDR";
pub const ENV_STATIC_DIR: &str = "SITE_STATIC_DIR";
pub const ENV_BACKEND: &str = "SITE_BACKEND";
pub const ENV_ADMIN_EMAILS: &str = "SITE_ADMIN_EMAILS";
pub const ENV_PUBLIC_URL: &str = "SITE_PUBLIC_URL";
pub const ENV_DEV_TOKENS: &str = "SITE_DEV_TOKENS";
pub const ENV_MAX_UPLOAD_MB: &str = "SITE_MAX_UPLOAD_MB";

/// Which services back the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendMode {
    /// Hosted Firebase project (or its emulators)
    Firebase,
    /// Process-local stores, for development
    Memory,
}

impl std::str::FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(BackendMode::Firebase),
            "memory" => Ok(BackendMode::Memory),
            other => bail!("unknown backend '{}', expected 'firebase' or 'memory'", other),
        }
    }
}

/// Configuration for the site server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Built front-end (index.html and assets)
    pub static_dir: PathBuf,
    pub backend: BackendMode,
    /// Emails allowed to create posts
    pub admins: AdminList,
    /// External base URL, used for memory-mode blob links
    pub public_url: String,
    /// `token=email` pairs accepted in memory mode
    pub dev_tokens: String,
    /// Max upload size in MB
    pub max_upload_mb: usize,
    /// Project settings, read when the Firebase backend is selected
    pub firebase: Option<FirebaseConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            static_dir: PathBuf::from("dist"),
            backend: BackendMode::Firebase,
            admins: AdminList::default(),
            public_url: "http://localhost:3001".to_string(),
            dev_tokens: String::new(),
            max_upload_mb: 50,
            firebase: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", ENV_BIND_ADDR, addr))?;
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(ENV_BACKEND) {
            config.backend = mode.parse()?;
        }
        if let Some(list) = lookup(ENV_ADMIN_EMAILS) {
            config.admins = AdminList::parse(&list);
        }
        if let Some(url) = lookup(ENV_PUBLIC_URL) {
            config.public_url = url.trim_end_matches('/').to_string();
        }
        if let Some(tokens) = lookup(ENV_DEV_TOKENS) {
            config.dev_tokens = tokens;
        }
        if let Some(mb) = lookup(ENV_MAX_UPLOAD_MB) {
            config.max_upload_mb = mb
                .parse()
                .with_context(|| format!("{} must be a number of megabytes", ENV_MAX_UPLOAD_MB))?;
        }
        if config.backend == BackendMode::Firebase {
            let firebase = FirebaseConfig::from_lookup(&lookup).context("Firebase configuration")?;
            config.firebase = Some(firebase);
        }

        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Present in memory mode, where the server also serves the blobs.
    pub memory_blobs: Option<Arc<MemoryBlobStore>>,
}

impl AppState {
    /// Wire up the backend selected by `config`.
    pub fn build(config: &ServerConfig) -> anyhow::Result<Self> {
        if config.admins.is_empty() {
            warn!("{} is empty; nobody can create posts", ENV_ADMIN_EMAILS);
        } else {
            info!("Admin allow-list: {} address(es)", config.admins.len());
        }

        match config.backend {
            BackendMode::Firebase => {
                let firebase = config
                    .firebase
                    .clone()
                    .context("Firebase backend selected without project configuration")?;
                let app = FirebaseApp::initialize(firebase)?;
                let backend = Backend::new(
                    Arc::new(FirestoreClient::new(app.clone())),
                    Arc::new(FirebaseStorageClient::new(app.clone())),
                );
                Ok(Self {
                    store: Arc::new(ContentStore::new(backend, config.admins.clone())),
                    identity: Arc::new(FirebaseIdentityProvider::new(app)),
                    static_dir: config.static_dir.clone(),
                    max_upload_bytes: config.max_upload_bytes(),
                    memory_blobs: None,
                })
            }
            BackendMode::Memory => {
                let identity = StaticIdentityProvider::parse(&config.dev_tokens)?;
                info!("Memory backend with {} dev token(s)", identity.len());
                Ok(Self::memory(config, identity))
            }
        }
    }

    /// State over fresh in-memory stores.
    pub fn memory(config: &ServerConfig, identity: StaticIdentityProvider) -> Self {
        let documents = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new(config.public_url.clone()));
        Self::with_memory_stores(config, documents, blobs, identity)
    }

    pub fn with_memory_stores(
        config: &ServerConfig,
        documents: Arc<MemoryDocumentStore>,
        blobs: Arc<MemoryBlobStore>,
        identity: StaticIdentityProvider,
    ) -> Self {
        let backend = Backend::new(documents, blobs.clone());
        Self {
            store: Arc::new(ContentStore::new(backend, config.admins.clone())),
            identity: Arc::new(identity),
            static_dir: config.static_dir.clone(),
            max_upload_bytes: config.max_upload_bytes(),
            memory_blobs: Some(blobs),
        }
    }
}
