/// Config schema types (server, plugins, browser).
use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Default port the plugin service listens on.
pub const DEFAULT_PORT: u16 = 42562;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleuthConfig {
    pub server: ServerConfig,
    pub plugins: PluginsConfig,
    pub browser: BrowserConfig,
}

/// Plugin service HTTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to [`DEFAULT_PORT`].
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: DEFAULT_PORT,
        }
    }
}

/// Entity catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory `sleuth init` writes new plugin sources into.
    pub dir: PathBuf,
    /// Entity names that are not loaded into the registry.
    pub disabled: Vec<String>,
    /// Per-entity settings handed to transforms through their execution context.
    pub settings: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("plugins"),
            disabled: Vec::new(),
            settings: HashMap::new(),
        }
    }
}

impl PluginsConfig {
    /// Whether `name` was disabled in config. Names compare in snake case.
    pub fn is_disabled(&self, name: &str) -> bool {
        let name = sleuth_common::to_snake_case(name);
        self.disabled
            .iter()
            .any(|d| sleuth_common::to_snake_case(d) == name)
    }

    /// Settings table for one entity, empty when none is configured.
    ///
    /// Keys compare in snake case like [`Self::is_disabled`]; an exact key
    /// wins over one that only matches after snake-casing.
    pub fn settings_for(&self, name: &str) -> serde_json::Map<String, serde_json::Value> {
        if let Some(table) = self.settings.get(name) {
            return table.clone();
        }
        let name = sleuth_common::to_snake_case(name);
        self.settings
            .iter()
            .find(|(key, _)| sleuth_common::to_snake_case(key) == name)
            .map(|(_, table)| table.clone())
            .unwrap_or_default()
    }
}

/// Page-loading capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// When false, transforms get no browser capability at all.
    pub enabled: bool,
    /// Maximum concurrently leased browser sessions.
    pub max_sessions: usize,
    /// Per-page load timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sessions: 2,
            timeout_secs: 30,
            user_agent: format!("sleuth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
