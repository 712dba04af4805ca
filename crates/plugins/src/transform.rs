//! Transform descriptors and the handler interface.

use std::{fmt, future::Future, sync::Arc};

use {async_trait::async_trait, serde::Serialize};

use crate::{
    blueprint::Blueprint, context::ExecutionContext, error::TransformError, schema::InputRecord,
};

/// Default icon of a transform's context-menu entry.
pub const DEFAULT_TRANSFORM_ICON: &str = "list";

/// Default label of the edge connecting a transform's source and its results.
pub const DEFAULT_EDGE_LABEL: &str = "transformed_to";

/// What a transform produced: nothing, one blueprint, or an ordered list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransformOutput {
    #[default]
    None,
    One(Blueprint),
    Many(Vec<Blueprint>),
}

impl TransformOutput {
    pub fn into_vec(self) -> Vec<Blueprint> {
        match self {
            Self::None => Vec::new(),
            Self::One(bp) => vec![bp],
            Self::Many(bps) => bps,
        }
    }
}

impl From<Blueprint> for TransformOutput {
    fn from(bp: Blueprint) -> Self {
        Self::One(bp)
    }
}

impl From<Vec<Blueprint>> for TransformOutput {
    fn from(bps: Vec<Blueprint>) -> Self {
        Self::Many(bps)
    }
}

impl From<Option<Blueprint>> for TransformOutput {
    fn from(bp: Option<Blueprint>) -> Self {
        bp.map_or(Self::None, Self::One)
    }
}

impl From<()> for TransformOutput {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl FromIterator<Blueprint> for TransformOutput {
    fn from_iter<I: IntoIterator<Item = Blueprint>>(iter: I) -> Self {
        Self::Many(iter.into_iter().collect())
    }
}

/// Transform logic supplied by a plugin author.
#[async_trait]
pub trait TransformHandler: Send + Sync {
    async fn run(
        &self,
        input: InputRecord,
        ctx: ExecutionContext,
    ) -> Result<TransformOutput, TransformError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> TransformHandler for FnHandler<F>
where
    F: Fn(InputRecord, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TransformOutput, TransformError>> + Send + 'static,
{
    async fn run(
        &self,
        input: InputRecord,
        ctx: ExecutionContext,
    ) -> Result<TransformOutput, TransformError> {
        (self.0)(input, ctx).await
    }
}

/// A context-menu operation of one entity.
#[derive(Clone, Serialize)]
pub struct TransformDescriptor {
    name: String,
    label: String,
    icon: String,
    edge_label: String,
    #[serde(skip)]
    handler: Arc<dyn TransformHandler>,
}

impl TransformDescriptor {
    /// Transform backed by an async function. The name is the snake-cased label.
    pub fn new<F, Fut>(label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InputRecord, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransformOutput, TransformError>> + Send + 'static,
    {
        Self::with_handler(label, Arc::new(FnHandler(handler)))
    }

    pub fn with_handler(label: impl Into<String>, handler: Arc<dyn TransformHandler>) -> Self {
        let label = label.into().trim().to_string();
        Self {
            name: sleuth_common::to_snake_case(&label),
            label,
            icon: DEFAULT_TRANSFORM_ICON.into(),
            edge_label: DEFAULT_EDGE_LABEL.into(),
            handler,
        }
    }

    /// Override the name derived from the label.
    #[must_use]
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = sleuth_common::to_snake_case(name.as_ref());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = edge_label.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn edge_label(&self) -> &str {
        &self.edge_label
    }

    pub fn handler(&self) -> &Arc<dyn TransformHandler> {
        &self.handler
    }
}

impl fmt::Debug for TransformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("icon", &self.icon)
            .field("edge_label", &self.edge_label)
            .finish_non_exhaustive()
    }
}
