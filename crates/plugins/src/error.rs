use std::fmt;

use {serde::Serialize, thiserror::Error};

/// A plugin's own declarations are inconsistent.
///
/// Raised while compiling a plugin definition into the registry, or while
/// building/normalizing a blueprint that references something the target
/// entity never declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("plugin '{name}' is already registered")]
    DuplicatePlugin { name: String },

    #[error("plugin name '{name}' is invalid: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("plugin '{plugin}' has invalid color '{color}', expected #rgb or #rrggbb")]
    InvalidColor { plugin: String, color: String },

    #[error("plugin '{plugin}' declares a {kind} element without a label")]
    EmptyLabel { plugin: String, kind: &'static str },

    #[error("plugin '{plugin}' declares label '{label}' more than once (field '{field}')")]
    DuplicateLabel {
        plugin: String,
        label: String,
        field: String,
    },

    #[error("plugin '{plugin}' declares dropdown '{label}' without options")]
    EmptyDropdown { plugin: String, label: String },

    #[error("plugin '{plugin}' declares transform '{transform}' more than once")]
    DuplicateTransform { plugin: String, transform: String },

    #[error("blueprint references unregistered entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("entity '{entity}' has no element matching property '{property}'")]
    UnknownProperty { entity: String, property: String },

    #[error("entity '{entity}' receives property '{property}' more than once")]
    DuplicateProperty { entity: String, property: String },

    #[error("plugin '{plugin}' declares an invalid default for '{label}': {issue}")]
    InvalidDefault {
        plugin: String,
        label: String,
        issue: FieldIssue,
    },
}

impl DefinitionError {
    /// Name of the plugin (or referenced entity) the error belongs to.
    pub fn plugin(&self) -> &str {
        match self {
            Self::DuplicatePlugin { name } | Self::InvalidName { name, .. } => name,
            Self::InvalidColor { plugin, .. }
            | Self::EmptyLabel { plugin, .. }
            | Self::DuplicateLabel { plugin, .. }
            | Self::EmptyDropdown { plugin, .. }
            | Self::DuplicateTransform { plugin, .. }
            | Self::InvalidDefault { plugin, .. } => plugin,
            Self::UnknownEntity { entity }
            | Self::UnknownProperty { entity, .. }
            | Self::DuplicateProperty { entity, .. } => entity,
        }
    }
}

/// Why a single input field failed to coerce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIssue {
    #[error("a value is required")]
    Missing,

    #[error("'{value}' is not one of [{}]", .allowed.join(", "))]
    InvalidChoice { value: String, allowed: Vec<String> },

    #[error("'{raw}' is not a valid {expected}")]
    NotANumber { raw: String, expected: NumberKind },

    #[error("'{file}' is not a supported file type [{}]", .allowed.join(", "))]
    UnsupportedFile { file: String, allowed: Vec<String> },

    #[error("expected {expected}, got {got}")]
    WrongType {
        expected: &'static str,
        got: &'static str,
    },

    #[error("no such field")]
    Unknown,

    #[error("supplied more than once")]
    Duplicate,
}

/// Numeric intent signalled by a numeric input widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Integer,
    Decimal,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("whole number"),
            Self::Decimal => f.write_str("decimal number"),
        }
    }
}

/// One failing input field, keyed by the element label the user sees.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{label}: {issue}")]
pub struct FieldError {
    pub label: String,
    pub field: String,
    pub issue: FieldIssue,
}

impl Serialize for FieldError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("FieldError", 3)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("field", &self.field)?;
        s.serialize_field("message", &self.issue.to_string())?;
        s.end()
    }
}

/// Raw input failed to coerce against an entity's node schema.
///
/// Always carries every failing field, never just the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid input for '{entity}': {}", join_fields(.errors))]
pub struct ValidationError {
    pub entity: String,
    pub errors: Vec<FieldError>,
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Invocation referenced something the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("entity '{entity}' is not registered")]
    Entity { entity: String },

    #[error("entity '{entity}' has no transform '{transform}'")]
    Transform { entity: String, transform: String },
}

/// A capability the transform asked for is not part of its context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("capability '{0}' is not available")]
    Missing(String),

    #[error("capability '{name}' is not a {expected}")]
    WrongType { name: String, expected: &'static str },

    #[error("browser pool is closed")]
    BrowserClosed,
}

/// Error returned from transform handler code.
///
/// `Plugin` is a deliberate, user-facing message. Anything converted through
/// `?` from another error type lands in `Internal` and is redacted before it
/// reaches the user.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{0}")]
    Plugin(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TransformError {
    #[must_use]
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin(message.into())
    }
}

impl From<ContextError> for TransformError {
    fn from(err: ContextError) -> Self {
        Self::Internal(err.into())
    }
}

/// Terminal failure of one `Registry::invoke` call.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Plugin(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("transform failed unexpectedly (incident {incident})")]
    Internal { incident: uuid::Uuid },

    #[error("invocation cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Plugin(_) => "plugin",
            Self::Definition(_) => "definition",
            Self::Internal { .. } => "internal",
            Self::Cancelled => "cancelled",
        }
    }

    /// Message safe to show to the end user.
    ///
    /// Plugin messages and validation field lists pass through verbatim;
    /// definition and internal failures are reduced to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(e) => e.to_string(),
            Self::Validation(e) => e.to_string(),
            Self::Plugin(message) => message.clone(),
            Self::Definition(_) => "the plugin produced a malformed result".to_string(),
            Self::Internal { incident } => {
                format!("the transform failed unexpectedly (incident {incident})")
            },
            Self::Cancelled => "the transform was cancelled".to_string(),
        }
    }
}
