//! Plugin definitions and their compiled descriptors.
//!
//! Authors describe an entity with a [`PluginDefinition`] builder. The
//! registry compiles it into an immutable [`PluginDescriptor`], checking the
//! declarations and caching the input shape once.

use std::collections::HashSet;

use {
    serde::Serialize,
    serde_json::{Value, json},
};

use crate::{
    blueprint::{Blueprint, flatten_properties},
    element::ElementSpec,
    error::DefinitionError,
    schema::{InputShape, NodeItem, NodeSchema},
    transform::TransformDescriptor,
};

pub const DEFAULT_COLOR: &str = "#145070";
pub const DEFAULT_ICON: &str = "atom-2";

/// Author-facing description of one entity and its transforms.
#[derive(Debug, Clone)]
pub struct PluginDefinition {
    name: Option<String>,
    label: String,
    color: String,
    icon: String,
    description: Option<String>,
    author: Vec<String>,
    is_visible: bool,
    node: NodeSchema,
    transforms: Vec<TransformDescriptor>,
}

impl PluginDefinition {
    /// New definition; the registry name defaults to the snake-cased label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            name: None,
            label: label.into().trim().to_string(),
            color: DEFAULT_COLOR.into(),
            icon: DEFAULT_ICON.into(),
            description: None,
            author: Vec::new(),
            is_visible: true,
            node: NodeSchema::new(),
            transforms: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author.push(author.into());
        self
    }

    /// Only creatable as a transform result, never directly by the user.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    #[must_use]
    pub fn node(mut self, node: impl Into<NodeSchema>) -> Self {
        self.node = node.into();
        self
    }

    #[must_use]
    pub fn element(mut self, spec: ElementSpec) -> Self {
        self.node = self.node.element(spec);
        self
    }

    #[must_use]
    pub fn row(mut self, specs: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.node = self.node.row(specs);
        self
    }

    #[must_use]
    pub fn transform(mut self, transform: TransformDescriptor) -> Self {
        self.transforms.push(transform);
        self
    }

    /// The name this definition registers under.
    pub fn registry_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| sleuth_common::to_snake_case(&self.label))
    }
}

/// A registered entity type. Immutable once compiled.
#[derive(Debug, Clone, Serialize)]
pub struct PluginDescriptor {
    name: String,
    label: String,
    color: String,
    icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    author: Vec<String>,
    is_visible: bool,
    node: NodeSchema,
    transforms: Vec<TransformDescriptor>,
    #[serde(skip)]
    shape: InputShape,
}

impl PluginDescriptor {
    /// Check a definition and compile its input shape.
    pub fn compile(def: PluginDefinition) -> Result<Self, DefinitionError> {
        let name = def.registry_name();
        check_name(&name)?;
        if def.label.is_empty() {
            return Err(DefinitionError::InvalidName {
                name,
                reason: "label must not be empty".into(),
            });
        }
        if !is_hex_color(&def.color) {
            return Err(DefinitionError::InvalidColor {
                plugin: name,
                color: def.color,
            });
        }

        let shape = InputShape::compile(&name, &def.node)?;

        let mut seen = HashSet::new();
        for t in &def.transforms {
            if t.name().is_empty() || !seen.insert(t.name()) {
                return Err(DefinitionError::DuplicateTransform {
                    plugin: name,
                    transform: t.label().to_string(),
                });
            }
        }

        Ok(Self {
            name,
            label: def.label,
            color: def.color,
            icon: def.icon,
            description: def.description,
            author: def.author,
            is_visible: def.is_visible,
            node: def.node,
            transforms: def.transforms,
            shape,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn author(&self) -> &[String] {
        &self.author
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn node(&self) -> &NodeSchema {
        &self.node
    }

    pub fn shape(&self) -> &InputShape {
        &self.shape
    }

    /// Transforms in declaration order.
    pub fn transforms(&self) -> &[TransformDescriptor] {
        &self.transforms
    }

    /// Transform by name or label; both compare in snake case.
    pub fn transform(&self, name: &str) -> Option<&TransformDescriptor> {
        let name = sleuth_common::to_snake_case(name);
        self.transforms.iter().find(|t| t.name() == name)
    }

    /// Build a blueprint of this entity.
    ///
    /// Keys are matched to elements by snake-cased label; structured values
    /// expand into `{field}_{subfield}` properties.
    pub fn blueprint<I, K>(&self, values: I) -> Result<Blueprint, DefinitionError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Ok(Blueprint {
            entity_name: self.name.clone(),
            properties: flatten_properties(self, values)?,
            edge_label: None,
        })
    }

    /// The node as the UI renders it in the creation dialog, each element
    /// carrying its default value.
    pub fn template(&self) -> Value {
        let render = |spec: &ElementSpec| {
            let mut el = serde_json::to_value(spec).unwrap_or(Value::Null);
            if spec.kind().is_input()
                && let Value::Object(ref mut obj) = el
            {
                obj.insert("value".into(), spec.default_value());
            }
            el
        };
        let elements: Vec<Value> = self
            .node
            .items()
            .iter()
            .map(|item| match item {
                NodeItem::Element(spec) => render(spec),
                NodeItem::Row(row) => Value::Array(row.iter().map(render).collect()),
            })
            .collect();
        json!({
            "name": self.name,
            "label": self.label,
            "color": self.color,
            "icon": self.icon,
            "elements": elements,
        })
    }
}

fn check_name(name: &str) -> Result<(), DefinitionError> {
    let canonical = sleuth_common::to_snake_case(name);
    let reason = if name.is_empty() {
        "name must not be empty".to_string()
    } else if canonical != name {
        format!("name must be snake case (e.g. '{canonical}')")
    } else {
        return Ok(());
    };
    Err(DefinitionError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
