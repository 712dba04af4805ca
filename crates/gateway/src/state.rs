use std::sync::Arc;

use {
    sleuth_config::PluginsConfig,
    sleuth_plugins::{BrowserPool, ExecutionContext, PluginSource, Registry},
    tokio::sync::RwLock,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

/// Shared state of the running service.
pub struct GatewayState {
    registry: RwLock<Arc<Registry>>,
    source: Arc<dyn PluginSource>,
    plugins: PluginsConfig,
    browser: Option<BrowserPool>,
    shutdown: CancellationToken,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    /// Load the registry from `source` and wrap everything for sharing.
    pub fn new(
        source: Arc<dyn PluginSource>,
        plugins: PluginsConfig,
        browser: Option<BrowserPool>,
    ) -> Arc<Self> {
        let registry = Registry::load(source.as_ref());
        Arc::new(Self {
            registry: RwLock::new(Arc::new(registry)),
            source,
            plugins,
            browser,
            shutdown: CancellationToken::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Snapshot of the current registry.
    ///
    /// In-flight invocations keep the snapshot they started with across a
    /// reload.
    pub async fn registry(&self) -> Arc<Registry> {
        Arc::clone(&*self.registry.read().await)
    }

    /// Rebuild the registry from the plugin source and swap it in.
    pub async fn reload(&self) -> Arc<Registry> {
        let fresh = Arc::new(Registry::load(self.source.as_ref()));
        *self.registry.write().await = Arc::clone(&fresh);
        info!(
            loaded = fresh.catalog().len(),
            rejected = fresh.rejected().len(),
            "registry reloaded"
        );
        fresh
    }

    /// Execution context for one invocation on `entity`.
    ///
    /// Carries the entity's configured settings, the browser pool when one is
    /// enabled and a token cancelled on shutdown.
    pub fn context_for(&self, entity: &str) -> ExecutionContext {
        let ctx = ExecutionContext::new()
            .with_settings(self.plugins.settings_for(entity))
            .with_cancellation(self.shutdown.child_token());
        match &self.browser {
            Some(pool) => ctx.with_browser(pool.clone()),
            None => ctx,
        }
    }

    /// Cancel every running invocation and close the browser pool.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(pool) = &self.browser {
            pool.close();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
