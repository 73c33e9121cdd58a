//! Loads the inventory seed document once at startup.
//!
//! Two sources exist: a document-store URL (the `_all_docs?include_docs=true`
//! listing or a single document) and a local JSON file. The load runs in the
//! background; until it lands, every stock check fails.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use brewline_agent::runtime::AgentRuntime;
use brewline_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use brewline_core::config::InventoryConfig;
use brewline_core::domain::inventory::{InventorySeedError, InventoryStore};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum InventorySourceError {
    #[error("could not read inventory seed `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("inventory request failed: {0}")]
    Transport(String),
    #[error("inventory store returned status {0}")]
    Status(u16),
    #[error("inventory seed is not valid json: {0}")]
    Decode(String),
    #[error("inventory listing contained no documents")]
    EmptyListing,
    #[error(transparent)]
    Seed(#[from] InventorySeedError),
}

#[async_trait]
pub trait InventorySource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Value, InventorySourceError>;
}

/// Picks the seed out of a raw document-store payload.
///
/// A listing (`{"rows":[{"doc":{...}}]}`) yields its first row's `doc`, with
/// the store's `_id`/`_rev` bookkeeping left for `InventoryStore::from_seed`
/// to skip. Anything else is taken as the seed itself.
pub fn extract_seed(payload: Value) -> Result<Value, InventorySourceError> {
    match payload {
        Value::Object(mut object) if object.contains_key("rows") => {
            let first_doc = match object.remove("rows") {
                Some(Value::Array(rows)) => {
                    rows.into_iter().next().and_then(|row| match row {
                        Value::Object(mut row) => row.remove("doc"),
                        _ => None,
                    })
                }
                _ => None,
            };
            first_doc.ok_or(InventorySourceError::EmptyListing)
        }
        other => Ok(other),
    }
}

pub struct DocumentStoreSource {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl DocumentStoreSource {
    pub fn new(
        url: impl Into<String>,
        username: Option<String>,
        password: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into(), username, password })
    }
}

#[async_trait]
impl InventorySource for DocumentStoreSource {
    fn describe(&self) -> String {
        format!("document store {}", self.url)
    }

    async fn fetch(&self) -> Result<Value, InventorySourceError> {
        let mut request = self.client.get(&self.url);
        if let Some(username) = &self.username {
            request = request
                .basic_auth(username, self.password.as_ref().map(|secret| secret.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|error| InventorySourceError::Transport(error.to_string()))?;
        if !response.status().is_success() {
            return Err(InventorySourceError::Status(response.status().as_u16()));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| InventorySourceError::Decode(error.to_string()))?;
        extract_seed(payload)
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventorySource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn fetch(&self) -> Result<Value, InventorySourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| InventorySourceError::ReadFile { path: self.path.clone(), source })?;
        let payload = serde_json::from_str::<Value>(&raw)
            .map_err(|error| InventorySourceError::Decode(error.to_string()))?;
        extract_seed(payload)
    }
}

/// The configured source, if any. A seed file wins over a store URL.
pub fn source_from_config(
    config: &InventoryConfig,
    timeout: Duration,
) -> Result<Option<Arc<dyn InventorySource>>, reqwest::Error> {
    if let Some(path) = &config.seed_path {
        return Ok(Some(Arc::new(FileSource::new(path.clone()))));
    }
    match &config.url {
        Some(url) => Ok(Some(Arc::new(DocumentStoreSource::new(
            url.clone(),
            config.username.clone(),
            config.password.clone(),
            timeout,
        )?))),
        None => Ok(None),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryLoadStatus {
    NotConfigured,
    Pending,
    Loaded { item_count: usize },
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct InventoryLoadTracker {
    status: Arc<Mutex<InventoryLoadStatus>>,
}

impl InventoryLoadTracker {
    pub fn new(initial: InventoryLoadStatus) -> Self {
        Self { status: Arc::new(Mutex::new(initial)) }
    }

    pub fn status(&self) -> InventoryLoadStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, status: InventoryLoadStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

pub async fn load_inventory(
    source: &dyn InventorySource,
    runtime: &AgentRuntime,
) -> Result<usize, InventorySourceError> {
    let seed = source.fetch().await?;
    let store = InventoryStore::from_seed(&seed)?;
    let item_count = store.item_count();
    runtime.populate_inventory(store);
    Ok(item_count)
}

pub fn spawn_inventory_load(
    source: Arc<dyn InventorySource>,
    runtime: Arc<AgentRuntime>,
    tracker: InventoryLoadTracker,
    audit: Arc<dyn AuditSink>,
) -> JoinHandle<()> {
    tracker.set(InventoryLoadStatus::Pending);
    tokio::spawn(async move {
        let origin = source.describe();
        let context = AuditContext::new("bootstrap", "inventory-loader");
        match load_inventory(source.as_ref(), runtime.as_ref()).await {
            Ok(item_count) => {
                info!(
                    event_name = "server.inventory.loaded",
                    correlation_id = "bootstrap",
                    source = %origin,
                    item_count,
                    "inventory seed loaded"
                );
                audit.emit(
                    AuditEvent::new(
                        &context,
                        "inventory.loaded",
                        AuditCategory::Inventory,
                        AuditOutcome::Success,
                    )
                    .with_metadata("source", origin.as_str())
                    .with_metadata("item_count", item_count.to_string()),
                );
                tracker.set(InventoryLoadStatus::Loaded { item_count });
            }
            Err(load_error) => {
                error!(
                    event_name = "server.inventory.load_failed",
                    correlation_id = "bootstrap",
                    source = %origin,
                    error = %load_error,
                    "inventory seed could not be loaded; every item reads as unavailable"
                );
                audit.emit(
                    AuditEvent::new(
                        &context,
                        "inventory.load_failed",
                        AuditCategory::Inventory,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("source", origin.as_str())
                    .with_metadata("error", load_error.to_string()),
                );
                tracker.set(InventoryLoadStatus::Failed(load_error.to_string()));
            }
        }
    })
}

pub fn warn_not_configured() {
    warn!(
        event_name = "server.inventory.not_configured",
        correlation_id = "bootstrap",
        "no inventory source configured; every item reads as unavailable"
    );
}
