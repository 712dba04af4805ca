//! Node schemas and the input synthesizer.
//!
//! [`InputShape::compile`] turns a [`NodeSchema`] into a reusable field set
//! once per plugin; [`InputShape::instantiate`] validates one raw input map
//! into an [`InputRecord`] per invocation.

use std::collections::HashSet;

use {
    serde::{Serialize, Serializer, ser::SerializeSeq},
    serde_json::{Map, Value},
};

use crate::{
    element::{ElementKind, ElementSpec},
    error::{DefinitionError, FieldError, FieldIssue, ValidationError},
};

/// One layout slot: a lone element or a row of elements rendered side by side.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeItem {
    Element(ElementSpec),
    Row(Vec<ElementSpec>),
}

impl Serialize for NodeItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Element(spec) => spec.serialize(serializer),
            Self::Row(row) => {
                let mut seq = serializer.serialize_seq(Some(row.len()))?;
                for spec in row {
                    seq.serialize_element(spec)?;
                }
                seq.end()
            },
        }
    }
}

/// Ordered element declarations of an entity. Rows only affect rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NodeSchema {
    items: Vec<NodeItem>,
}

impl NodeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn element(mut self, spec: ElementSpec) -> Self {
        self.items.push(NodeItem::Element(spec));
        self
    }

    #[must_use]
    pub fn row(mut self, specs: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.items.push(NodeItem::Row(specs.into_iter().collect()));
        self
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    /// All elements in declaration order, rows flattened.
    pub fn elements(&self) -> impl Iterator<Item = &ElementSpec> {
        self.items.iter().flat_map(|item| match item {
            NodeItem::Element(spec) => std::slice::from_ref(spec).iter(),
            NodeItem::Row(row) => row.iter(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }
}

impl From<Vec<ElementSpec>> for NodeSchema {
    fn from(specs: Vec<ElementSpec>) -> Self {
        Self {
            items: specs.into_iter().map(NodeItem::Element).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    element: ElementSpec,
    /// Default after coercion, used when the user supplies nothing.
    default: Value,
}

/// Compiled field set of a node schema.
#[derive(Debug, Clone, Default)]
pub struct InputShape {
    /// Data-bearing fields in declaration order.
    fields: Vec<FieldSpec>,
    /// Every labelled element's field name, inputs and displays alike.
    properties: Vec<String>,
}

impl InputShape {
    /// Compile the schema of `plugin`.
    ///
    /// Fails on input elements without a label, dropdowns without options,
    /// labels that collide after snake-casing, and declared defaults the
    /// element itself would reject.
    pub fn compile(plugin: &str, schema: &NodeSchema) -> Result<Self, DefinitionError> {
        let mut shape = Self::default();
        let mut seen = HashSet::new();

        for element in schema.elements() {
            let name = element.field_name();
            if name.is_empty() {
                if element.kind().is_input() {
                    return Err(DefinitionError::EmptyLabel {
                        plugin: plugin.to_string(),
                        kind: element.kind().as_str(),
                    });
                }
                continue;
            }
            if !seen.insert(name.clone()) {
                return Err(DefinitionError::DuplicateLabel {
                    plugin: plugin.to_string(),
                    label: element.label().to_string(),
                    field: name,
                });
            }
            if element.kind() == ElementKind::Dropdown && element.options().is_empty() {
                return Err(DefinitionError::EmptyDropdown {
                    plugin: plugin.to_string(),
                    label: element.label().to_string(),
                });
            }
            shape.properties.push(name.clone());
            if element.kind().is_input() {
                shape.fields.push(FieldSpec {
                    default: checked_default(plugin, element)?,
                    name,
                    element: element.clone(),
                });
            }
        }
        Ok(shape)
    }

    /// Input field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Every property name a blueprint of this entity may carry.
    pub fn property_names(&self) -> &[String] {
        &self.properties
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    /// Whether `key` is a property name or an already flattened
    /// `{property}_{subfield}`.
    pub fn traces(&self, key: &str) -> bool {
        self.properties.iter().any(|p| {
            key == p
                || key
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.len() > 1 && rest.starts_with('_'))
        })
    }

    /// Validate `raw` into a record.
    ///
    /// Keys are matched by snake-cased name, so both `"Profile Link"` and
    /// `"profile_link"` address the same field. Values of display elements
    /// (flattened or not) are passed through uncoerced as
    /// [`InputRecord::displayed`]; keys naming nothing are errors. Every
    /// failing field is reported together.
    pub fn instantiate(
        &self,
        entity: &str,
        raw: &Map<String, Value>,
    ) -> Result<InputRecord, ValidationError> {
        let mut supplied: Map<String, Value> = Map::new();
        let mut displayed: Map<String, Value> = Map::new();
        let mut errors = Vec::new();

        for (key, value) in raw {
            let name = sleuth_common::to_snake_case(key);
            if supplied.contains_key(&name) || displayed.contains_key(&name) {
                errors.push(FieldError {
                    label: key.clone(),
                    field: name,
                    issue: FieldIssue::Duplicate,
                });
            } else if self.fields.iter().any(|f| f.name == name) {
                supplied.insert(name, value.clone());
            } else if self.traces(&name) {
                displayed.insert(name, value.clone());
            } else {
                errors.push(FieldError {
                    label: key.clone(),
                    field: name,
                    issue: FieldIssue::Unknown,
                });
            }
        }

        let mut fields = Map::new();
        for field in &self.fields {
            let value = match supplied.get(&field.name) {
                Some(v) if !is_blank(v) => field.element.coerce(v),
                _ if field.element.is_required() => Err(FieldIssue::Missing),
                _ => Ok(field.default.clone()),
            };
            match value {
                Ok(v) => {
                    fields.insert(field.name.clone(), v);
                },
                Err(issue) => errors.push(FieldError {
                    label: field.element.label().to_string(),
                    field: field.name.clone(),
                    issue,
                }),
            }
        }

        if errors.is_empty() {
            Ok(InputRecord { fields, displayed })
        } else {
            Err(ValidationError {
                entity: entity.to_string(),
                errors,
            })
        }
    }
}

/// The element's default, coerced like user input would be. Blank defaults
/// stay as they are.
fn checked_default(plugin: &str, element: &ElementSpec) -> Result<Value, DefinitionError> {
    let value = element.default_value();
    if is_blank(&value) {
        return Ok(value);
    }
    element
        .coerce(&value)
        .map_err(|issue| DefinitionError::InvalidDefault {
            plugin: plugin.to_string(),
            label: element.label().to_string(),
            issue,
        })
}

/// `null` and whitespace-only text count as "not supplied".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Validated transform input. Fields match the data-bearing elements of the
/// entity's node schema exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InputRecord {
    fields: Map<String, Value>,
    #[serde(skip)]
    displayed: Map<String, Value>,
}

impl InputRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Text value of `field`, `None` when absent, empty, or not text.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn decimal(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Value the node currently shows in a display element. Not validated.
    pub fn displayed(&self, property: &str) -> Option<&Value> {
        self.displayed.get(property)
    }
}

/// Convert a rendered element list (as the host stores node state) into a
/// raw input map keyed by label.
///
/// Each element contributes its `value`. Rows (nested arrays) are flattened;
/// elements without a label or value are skipped.
pub fn raw_input_from_elements(elements: &[Value]) -> Map<String, Value> {
    let mut raw = Map::new();
    for element in elements {
        match element {
            Value::Array(row) => raw.extend(raw_input_from_elements(row)),
            Value::Object(obj) => {
                let label = obj.get("label").and_then(Value::as_str).unwrap_or_default();
                if label.is_empty() {
                    continue;
                }
                if let Some(value) = obj.get("value") {
                    raw.insert(label.to_string(), value.clone());
                }
            },
            _ => {},
        }
    }
    raw
}
