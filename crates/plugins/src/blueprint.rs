//! Blueprints and the normalizer that turns transform output into flat
//! graph records.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    error::DefinitionError, plugin::PluginDescriptor, registry::Catalog, transform::TransformOutput,
};

/// A graph node to create: the entity it instantiates and its properties.
///
/// Built freely by handlers; [`normalize`] checks it against the catalog and
/// flattens structured values before it reaches the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub entity_name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_label: Option<String>,
}

impl Blueprint {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            ..Self::default()
        }
    }

    /// Set one property. Structured values are flattened during normalization.
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = Some(edge_label.into());
        self
    }
}

/// Normalize handler output into an ordered blueprint sequence.
///
/// Every blueprint must name a registered entity (hidden ones included) and
/// every property must trace back to an element of that entity.
pub fn normalize(
    output: TransformOutput,
    catalog: &Catalog,
) -> Result<Vec<Blueprint>, DefinitionError> {
    output
        .into_vec()
        .into_iter()
        .map(|bp| {
            let plugin = catalog
                .get(&bp.entity_name)
                .ok_or_else(|| DefinitionError::UnknownEntity {
                    entity: bp.entity_name.clone(),
                })?;
            let properties = flatten_properties(plugin, bp.properties)?;
            Ok(Blueprint {
                entity_name: plugin.name().to_string(),
                properties,
                edge_label: bp.edge_label,
            })
        })
        .collect()
}

/// Resolve keys by snake-cased label and flatten structured values into
/// `{field}_{subfield}` properties, keeping sub-field order.
pub(crate) fn flatten_properties<I, K>(
    plugin: &PluginDescriptor,
    values: I,
) -> Result<Map<String, Value>, DefinitionError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut out = Map::new();
    for (key, value) in values {
        let key = sleuth_common::to_snake_case(key.as_ref());
        if !plugin.shape().traces(&key) {
            return Err(DefinitionError::UnknownProperty {
                entity: plugin.name().to_string(),
                property: key,
            });
        }
        flatten_into(plugin, &mut out, key, value)?;
    }
    Ok(out)
}

/// Two keys that land on the same flattened property are an error, never a
/// silent overwrite.
fn flatten_into(
    plugin: &PluginDescriptor,
    out: &mut Map<String, Value>,
    prefix: String,
    value: Value,
) -> Result<(), DefinitionError> {
    match value {
        Value::Object(fields) => {
            for (sub, v) in fields {
                let sub = sleuth_common::to_snake_case(&sub);
                flatten_into(plugin, out, format!("{prefix}_{sub}"), v)?;
            }
        },
        scalar => {
            if out.contains_key(&prefix) {
                return Err(DefinitionError::DuplicateProperty {
                    entity: plugin.name().to_string(),
                    property: prefix,
                });
            }
            out.insert(prefix, scalar);
        },
    }
    Ok(())
}
