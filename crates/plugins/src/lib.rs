//! Plugin framework for graph entities.
//!
//! A plugin declares an entity type (its node schema of UI elements) and the
//! transforms that can run on it. The [`Registry`] compiles definitions,
//! validates user input against the node schema, dispatches transforms with
//! an [`ExecutionContext`] and normalizes their results into [`Blueprint`]s
//! the host persists as graph nodes.

pub mod blueprint;
pub mod context;
pub mod element;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod schema;
pub mod transform;

pub use {
    blueprint::{Blueprint, normalize},
    context::{BrowserPool, BrowserSession, ExecutionContext, GraphReader, Link, Page, PageLoader},
    element::{DropdownOption, ElementKind, ElementSpec},
    error::{
        ContextError, DefinitionError, FieldError, FieldIssue, InvokeError, NotFoundError,
        TransformError, ValidationError,
    },
    plugin::{PluginDefinition, PluginDescriptor},
    registry::{Catalog, InvocationState, PluginSource, Registry},
    schema::{InputRecord, InputShape, NodeItem, NodeSchema, raw_input_from_elements},
    transform::{TransformDescriptor, TransformHandler, TransformOutput},
};
