//! Built-in entity catalog.
//!
//! Each module contributes plugin definitions; [`builtin`] lists them in the
//! order the catalog shows them and [`BuiltinSource`] feeds them to a
//! [`Registry`](sleuth_plugins::Registry), skipping the ones disabled in
//! config.

pub mod search;
pub mod username;
pub mod web;

use {
    sleuth_config::PluginsConfig,
    sleuth_plugins::{PluginDefinition, PluginSource},
    tracing::debug,
};

/// Every built-in definition.
pub fn builtin() -> Vec<PluginDefinition> {
    vec![
        web::website(),
        web::url(),
        username::username(),
        username::username_profile(),
        search::search(),
        search::search_result(),
    ]
}

/// Built-in definitions minus those disabled in `[plugins]`.
#[derive(Debug, Clone, Default)]
pub struct BuiltinSource {
    config: PluginsConfig,
}

impl BuiltinSource {
    pub fn new(config: PluginsConfig) -> Self {
        Self { config }
    }
}

impl PluginSource for BuiltinSource {
    fn definitions(&self) -> Vec<PluginDefinition> {
        builtin()
            .into_iter()
            .filter(|def| {
                let name = def.registry_name();
                let disabled = self.config.is_disabled(&name);
                if disabled {
                    debug!(plugin = %name, "plugin disabled in config");
                }
                !disabled
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::HashMap, sync::Arc};

    use {
        async_trait::async_trait,
        serde_json::{Map, Value},
        sleuth_plugins::{BrowserPool, ExecutionContext, Link, Page, PageLoader, Registry},
    };

    /// Serves canned pages; unknown URLs load as 404.
    #[derive(Default)]
    pub struct FakeLoader {
        pages: HashMap<String, Page>,
    }

    impl FakeLoader {
        pub fn page(mut self, url: &str, status: u16, links: &[(&str, &str)]) -> Self {
            self.pages.insert(url.to_string(), Page {
                url: url.to_string(),
                status,
                title: None,
                text: String::new(),
                links: links
                    .iter()
                    .map(|(href, text)| Link {
                        href: (*href).to_string(),
                        text: (*text).to_string(),
                    })
                    .collect(),
            });
            self
        }
    }

    #[async_trait]
    impl PageLoader for FakeLoader {
        async fn load(&self, url: &str) -> anyhow::Result<Page> {
            Ok(self.pages.get(url).cloned().unwrap_or_else(|| Page {
                url: url.to_string(),
                status: 404,
                ..Page::default()
            }))
        }
    }

    pub fn registry() -> Registry {
        Registry::load(&super::builtin)
    }

    pub fn context(loader: FakeLoader) -> ExecutionContext {
        ExecutionContext::new().with_browser(BrowserPool::new(Arc::new(loader), 1))
    }

    pub fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_cleanly() {
        let registry = testing::registry();
        assert!(registry.rejected().is_empty());
        let visible: Vec<_> = registry
            .list_entities()
            .into_iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(visible, ["website", "url", "username", "search"]);
        assert_eq!(registry.all_entities().len(), 6);
    }

    #[test]
    fn disabled_entities_are_skipped() {
        let config = PluginsConfig {
            disabled: vec!["Username Profile".into(), "search".into()],
            ..PluginsConfig::default()
        };
        let names: Vec<_> = BuiltinSource::new(config)
            .definitions()
            .iter()
            .map(PluginDefinition::registry_name)
            .collect();
        assert_eq!(names, ["website", "url", "username", "search_result"]);
    }
}
