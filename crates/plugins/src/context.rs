//! Per-invocation capability bundle handed to transform handlers.
//!
//! A handler only reaches what its context carries: a browser session pool,
//! a read-only view of the host graph, the entity's settings, and any named
//! capability the host chose to add.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    tokio::sync::{OwnedSemaphorePermit, Semaphore},
    tokio_util::sync::CancellationToken,
};

use crate::{
    blueprint::{Blueprint, flatten_properties},
    error::{ContextError, DefinitionError},
    registry::Catalog,
};

pub const BROWSER: &str = "browser";
pub const GRAPH: &str = "graph";

// ── Browser capability ──────────────────────────────────────────────────────

/// One fetched page, reduced to what transforms scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub title: Option<String>,
    pub text: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// Loads pages on behalf of a browser session.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &str) -> anyhow::Result<Page>;
}

/// Bounded pool of browser sessions shared by concurrent invocations.
#[derive(Clone)]
pub struct BrowserPool {
    loader: Arc<dyn PageLoader>,
    permits: Arc<Semaphore>,
    max_sessions: usize,
}

impl BrowserPool {
    pub fn new(loader: Arc<dyn PageLoader>, max_sessions: usize) -> Self {
        let max_sessions = max_sessions.max(1);
        Self {
            loader,
            permits: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
        }
    }

    /// Lease a session, waiting while all sessions are in use.
    ///
    /// The lease is returned to the pool when the session is dropped.
    pub async fn session(&self) -> Result<BrowserSession, ContextError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ContextError::BrowserClosed)?;
        Ok(BrowserSession {
            loader: Arc::clone(&self.loader),
            _permit: permit,
        })
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Sessions not currently leased.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuse new leases. Outstanding sessions stay usable.
    pub fn close(&self) {
        self.permits.close();
    }
}

impl fmt::Debug for BrowserPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserPool")
            .field("max_sessions", &self.max_sessions)
            .field("available", &self.available())
            .finish()
    }
}

/// A leased browser session.
pub struct BrowserSession {
    loader: Arc<dyn PageLoader>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserSession {
    pub async fn load(&self, url: &str) -> anyhow::Result<Page> {
        self.loader.load(url).await
    }
}

// ── Graph capability ────────────────────────────────────────────────────────

/// Read-only lookups into the host's graph.
#[async_trait]
pub trait GraphReader: Send + Sync {
    async fn node(&self, id: &str) -> anyhow::Result<Option<Blueprint>>;

    async fn neighbors(&self, id: &str) -> anyhow::Result<Vec<Blueprint>>;
}

// ── ExecutionContext ────────────────────────────────────────────────────────

type Capability = Arc<dyn Any + Send + Sync>;

/// Capabilities of one transform invocation.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    capabilities: HashMap<String, Capability>,
    settings: Arc<Map<String, Value>>,
    cancel: CancellationToken,
    catalog: Option<Arc<Catalog>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_browser(self, pool: BrowserPool) -> Self {
        self.with_capability(BROWSER, pool)
    }

    #[must_use]
    pub fn with_graph(self, graph: Arc<dyn GraphReader>) -> Self {
        self.with_capability(GRAPH, graph)
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Add a named capability of any type.
    #[must_use]
    pub fn with_capability<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.capabilities.insert(name.into(), Arc::new(value));
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub(crate) fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn browser(&self) -> Result<BrowserPool, ContextError> {
        self.capability::<BrowserPool>(BROWSER)
            .map(|pool| pool.as_ref().clone())
    }

    pub fn graph(&self) -> Result<Arc<dyn GraphReader>, ContextError> {
        self.capability::<Arc<dyn GraphReader>>(GRAPH)
            .map(|graph| Arc::clone(&*graph))
    }

    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// One setting deserialized into `T`; `None` when absent or mistyped.
    pub fn setting<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContextError> {
        let cap = self
            .capabilities
            .get(name)
            .ok_or_else(|| ContextError::Missing(name.to_string()))?;
        Arc::clone(cap)
            .downcast::<T>()
            .map_err(|_| ContextError::WrongType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Build a checked blueprint for `entity`.
    ///
    /// Outside an invocation there is no catalog to check against, so the
    /// blueprint is built as given and checked later by the normalizer.
    pub fn blueprint<I, K>(&self, entity: &str, values: I) -> Result<Blueprint, DefinitionError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let Some(catalog) = &self.catalog else {
            return Ok(values
                .into_iter()
                .fold(Blueprint::new(entity), |bp, (k, v)| bp.with(k.as_ref(), v)));
        };
        let plugin = catalog
            .get(entity)
            .ok_or_else(|| DefinitionError::UnknownEntity {
                entity: entity.to_string(),
            })?;
        Ok(Blueprint {
            entity_name: plugin.name().to_string(),
            properties: flatten_properties(plugin, values)?,
            edge_label: None,
        })
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.capabilities.keys().collect();
        names.sort();
        f.debug_struct("ExecutionContext")
            .field("capabilities", &names)
            .field("settings", &self.settings.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
