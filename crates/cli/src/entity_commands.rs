//! `sleuth ls`, `sleuth run` and `sleuth blueprints`: catalog introspection
//! and one-shot transform runs against the local registry. Output is JSON.

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    serde_json::{Map, Value, json},
    sleuth_config::SleuthConfig,
    sleuth_plugins::{ExecutionContext, NotFoundError, Registry},
};

#[derive(Subcommand)]
pub enum LsAction {
    /// List entities.
    Entities {
        /// Include hidden entities.
        #[arg(long)]
        all: bool,
    },
    /// List the transforms of one entity.
    Transforms { entity: String },
}

pub fn list(registry: &Registry, action: &LsAction) -> Result<Value> {
    match action {
        LsAction::Entities { all } => {
            let entities = if *all {
                registry.all_entities()
            } else {
                registry.list_entities()
            };
            let rows: Vec<Value> = entities
                .into_iter()
                .map(|p| {
                    json!({
                        "name": p.name(),
                        "label": p.label(),
                        "visible": p.is_visible(),
                        "transforms": p.transforms().len(),
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        },
        LsAction::Transforms { entity } => Ok(serde_json::to_value(registry.list_transforms(entity)?)?),
    }
}

/// Blueprint templates of one entity, or of every entity.
pub fn blueprints(registry: &Registry, entity: Option<&str>) -> Result<Value> {
    match entity {
        Some(name) => {
            let plugin = registry.get(name).ok_or_else(|| NotFoundError::Entity {
                entity: name.to_string(),
            })?;
            Ok(plugin.template())
        },
        None => Ok(Value::Array(
            registry
                .all_entities()
                .into_iter()
                .map(|p| p.template())
                .collect(),
        )),
    }
}

/// Run one transform with `input` (a JSON object) and return the produced
/// blueprints.
pub async fn run(
    registry: &Registry,
    config: &SleuthConfig,
    entity: &str,
    transform: &str,
    input: &str,
) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(input).context("--input is not valid JSON")?;
    let raw: Map<String, Value> = match parsed {
        Value::Object(map) => map,
        other => bail!("--input must be a JSON object, got {other}"),
    };

    let settings_key = registry
        .get(entity)
        .map_or_else(|| entity.to_string(), |p| p.name().to_string());
    let mut ctx = ExecutionContext::new().with_settings(config.plugins.settings_for(&settings_key));
    if let Some(pool) = sleuth_browser::browser_pool(&config.browser)? {
        ctx = ctx.with_browser(pool);
    }

    match registry.invoke(entity, transform, &raw, ctx).await {
        Ok(blueprints) => Ok(serde_json::to_value(blueprints)?),
        Err(e) => bail!("{} error: {}", e.kind(), e.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::load(&sleuth_entities::builtin)
    }

    #[test]
    fn lists_visible_and_all_entities() {
        let registry = registry();
        let visible = list(&registry, &LsAction::Entities { all: false }).unwrap();
        assert_eq!(visible.as_array().unwrap().len(), 4);
        assert_eq!(visible[0]["name"], "website");

        let all = list(&registry, &LsAction::Entities { all: true }).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 6);
    }

    #[test]
    fn lists_transforms_of_an_entity() {
        let transforms = list(&registry(), &LsAction::Transforms {
            entity: "Search Result".into(),
        })
        .unwrap();
        let names: Vec<_> = transforms
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["to_website", "to_url"]);

        assert!(list(&registry(), &LsAction::Transforms {
            entity: "ghost".into()
        })
        .is_err());
    }

    #[test]
    fn blueprint_templates() {
        let one = blueprints(&registry(), Some("website")).unwrap();
        assert_eq!(one["name"], "website");
        assert_eq!(blueprints(&registry(), None).unwrap().as_array().unwrap().len(), 6);
        assert!(blueprints(&registry(), Some("ghost")).is_err());
    }

    #[tokio::test]
    async fn runs_a_transform() {
        let config = SleuthConfig::default();
        let out = run(&registry(), &config, "url", "to_website", r#"{"url": "https://www.example.com/x"}"#)
            .await
            .unwrap();
        assert_eq!(out[0]["entity_name"], "website");
        assert_eq!(out[0]["properties"]["domain"], "example.com");
    }

    #[tokio::test]
    async fn run_reports_bad_input() {
        let config = SleuthConfig::default();
        let registry = registry();
        let err = run(&registry, &config, "url", "to_website", "[1]").await.unwrap_err();
        assert!(err.to_string().contains("JSON object"));

        let err = run(&registry, &config, "url", "to_website", "{}").await.unwrap_err();
        assert!(err.to_string().starts_with("validation error"));
    }
}
