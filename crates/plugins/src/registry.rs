//! The entity registry and transform dispatch.

use std::{any::Any, collections::HashMap, fmt, panic::AssertUnwindSafe, sync::Arc};

use {
    futures::FutureExt,
    serde_json::{Map, Value},
    tracing::{debug, error, info, warn},
};

use crate::{
    blueprint::{Blueprint, normalize},
    context::ExecutionContext,
    error::{DefinitionError, InvokeError, NotFoundError, TransformError},
    plugin::{PluginDefinition, PluginDescriptor},
    transform::TransformDescriptor,
};

/// Raw input longer than this is cut before it is logged.
const LOGGED_INPUT_LIMIT: usize = 512;

// ── Catalog ─────────────────────────────────────────────────────────────────

/// Registered descriptors in registration order, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plugins: Vec<Arc<PluginDescriptor>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Look up by name or label, compared in snake case.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.index
            .get(&sleuth_common::to_snake_case(name))
            .map(|&i| self.plugins[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn insert(&mut self, plugin: PluginDescriptor) -> Result<(), DefinitionError> {
        if self.index.contains_key(plugin.name()) {
            return Err(DefinitionError::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        self.index.insert(plugin.name().to_string(), self.plugins.len());
        self.plugins.push(Arc::new(plugin));
        Ok(())
    }
}

// ── PluginSource ────────────────────────────────────────────────────────────

/// Supplies the plugin definitions a registry is loaded from.
pub trait PluginSource: Send + Sync {
    fn definitions(&self) -> Vec<PluginDefinition>;
}

impl<F> PluginSource for F
where
    F: Fn() -> Vec<PluginDefinition> + Send + Sync,
{
    fn definitions(&self) -> Vec<PluginDefinition> {
        self()
    }
}

// ── InvocationState ─────────────────────────────────────────────────────────

/// Lifecycle of one `invoke` call, as recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Validating,
    Validated,
    RejectedInput,
    Executing,
    Succeeded,
    Failed,
    Cancelled,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::RejectedInput | Self::Succeeded | Self::Failed | Self::Cancelled
        )
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Validated => "validated",
            Self::RejectedInput => "rejected_input",
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Explicitly constructed set of entities and the dispatcher for their
/// transforms.
///
/// Read-only once loaded; a reload builds a fresh registry from the source.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    catalog: Arc<Catalog>,
    rejected: Vec<DefinitionError>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every definition from `source`.
    ///
    /// A definition that fails to compile is left out and reported through
    /// [`rejected`](Self::rejected); the rest still load.
    pub fn load(source: &dyn PluginSource) -> Self {
        let mut registry = Self::new();
        for def in source.definitions() {
            let name = def.registry_name();
            if let Err(e) = registry.register(def) {
                warn!(plugin = %name, error = %e, "plugin rejected");
                registry.rejected.push(e);
            }
        }
        info!(
            loaded = registry.catalog.len(),
            rejected = registry.rejected.len(),
            "plugin registry loaded"
        );
        registry
    }

    /// Compile and register one definition.
    ///
    /// On error nothing changes; in particular an entity already registered
    /// under the same name stays untouched.
    pub fn register(&mut self, def: PluginDefinition) -> Result<(), DefinitionError> {
        let plugin = PluginDescriptor::compile(def)?;
        if self.catalog.contains(plugin.name()) {
            return Err(DefinitionError::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        debug!(
            plugin = plugin.name(),
            transforms = plugin.transforms().len(),
            "plugin registered"
        );
        Arc::make_mut(&mut self.catalog).insert(plugin)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Definitions rejected by the last [`load`](Self::load).
    pub fn rejected(&self) -> &[DefinitionError] {
        &self.rejected
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.catalog.get(name)
    }

    /// Entities the user may create directly, in registration order.
    pub fn list_entities(&self) -> Vec<&PluginDescriptor> {
        self.catalog.iter().filter(|p| p.is_visible()).collect()
    }

    /// Every registered entity, hidden ones included.
    pub fn all_entities(&self) -> Vec<&PluginDescriptor> {
        self.catalog.iter().collect()
    }

    /// Transforms of one entity in declaration order.
    pub fn list_transforms(&self, entity: &str) -> Result<&[TransformDescriptor], NotFoundError> {
        self.catalog
            .get(entity)
            .map(PluginDescriptor::transforms)
            .ok_or_else(|| NotFoundError::Entity {
                entity: entity.to_string(),
            })
    }

    /// Validate `raw` against the entity's schema, run the transform and
    /// normalize what it produced.
    ///
    /// The handler never runs on a lookup or validation failure. Cancelling
    /// the context's token drops the handler at its next suspension point.
    #[tracing::instrument(name = "invoke", skip(self, raw, ctx))]
    pub async fn invoke(
        &self,
        entity: &str,
        transform: &str,
        raw: &Map<String, Value>,
        ctx: ExecutionContext,
    ) -> Result<Vec<Blueprint>, InvokeError> {
        debug!(state = %InvocationState::Pending, "invocation received");
        let plugin = self
            .catalog
            .get(entity)
            .ok_or_else(|| NotFoundError::Entity {
                entity: entity.to_string(),
            })?;
        let descriptor = plugin
            .transform(transform)
            .ok_or_else(|| NotFoundError::Transform {
                entity: plugin.name().to_string(),
                transform: transform.to_string(),
            })?;

        debug!(state = %InvocationState::Validating, "validating input");
        let input = match plugin.shape().instantiate(plugin.name(), raw) {
            Ok(input) => input,
            Err(e) => {
                info!(
                    state = %InvocationState::RejectedInput,
                    fields = e.errors.len(),
                    "input rejected"
                );
                return Err(e.into());
            },
        };
        debug!(state = %InvocationState::Validated, fields = input.len(), "input validated");

        let cancel = ctx.cancellation().clone();
        let ctx = ctx.with_catalog(Arc::clone(&self.catalog));
        let run = AssertUnwindSafe(descriptor.handler().run(input, ctx)).catch_unwind();

        debug!(state = %InvocationState::Executing, "running transform");
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(state = %InvocationState::Cancelled, "transform cancelled");
                return Err(InvokeError::Cancelled);
            },
            outcome = run => outcome,
        };

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(TransformError::Plugin(message))) => {
                info!(state = %InvocationState::Failed, message = %message, "transform reported an error");
                return Err(InvokeError::Plugin(message));
            },
            Ok(Err(TransformError::Definition(e))) => {
                warn!(state = %InvocationState::Failed, error = %e, "transform built an invalid blueprint");
                return Err(e.into());
            },
            Ok(Err(TransformError::Internal(e))) => {
                return Err(internal_error(plugin, descriptor, raw, &format!("{e:#}")));
            },
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                return Err(internal_error(plugin, descriptor, raw, &format!("panicked: {message}")));
            },
        };

        let mut blueprints = normalize(output, &self.catalog).map_err(|e| {
            warn!(state = %InvocationState::Failed, error = %e, "transform result rejected");
            InvokeError::Definition(e)
        })?;
        for bp in &mut blueprints {
            bp.edge_label
                .get_or_insert_with(|| descriptor.edge_label().to_string());
        }

        info!(
            state = %InvocationState::Succeeded,
            blueprints = blueprints.len(),
            "transform completed"
        );
        Ok(blueprints)
    }
}

/// Log an unexpected handler failure with an incident id and return the
/// redacted error.
fn internal_error(
    plugin: &PluginDescriptor,
    transform: &TransformDescriptor,
    raw: &Map<String, Value>,
    cause: &str,
) -> InvokeError {
    let incident = uuid::Uuid::new_v4();
    let logged_input = truncate(&Value::Object(raw.clone()).to_string(), LOGGED_INPUT_LIMIT);
    error!(
        state = %InvocationState::Failed,
        %incident,
        entity = plugin.name(),
        transform = transform.name(),
        input = %logged_input,
        cause,
        "transform failed unexpectedly"
    );
    InvokeError::Internal { incident }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use {serde_json::json, tokio_util::sync::CancellationToken};

    use {
        super::*,
        crate::{
            element::{DropdownOption, ElementSpec},
            schema::InputRecord,
            transform::TransformOutput,
        },
    };

    type HandlerResult = Result<TransformOutput, TransformError>;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    async fn to_result(input: InputRecord, ctx: ExecutionContext) -> HandlerResult {
        let query = input
            .text("query")
            .ok_or_else(|| TransformError::plugin("Please provide a search query."))?;
        let bp = ctx.blueprint(
            "search_result",
            [
                ("result", json!({"title": query, "subtitle": "S", "text": "X"})),
                ("url", json!("https://example.com")),
            ],
        )?;
        Ok(bp.into())
    }

    async fn nothing(_input: InputRecord, _ctx: ExecutionContext) -> HandlerResult {
        Ok(Vec::<Blueprint>::new().into())
    }

    async fn counted(_input: InputRecord, _ctx: ExecutionContext) -> HandlerResult {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(TransformOutput::None)
    }

    async fn faulty(_input: InputRecord, _ctx: ExecutionContext) -> HandlerResult {
        let parsed = "not a number".parse::<u32>().map_err(anyhow::Error::from)?;
        Ok(Blueprint::new("search_result").with("url", parsed).into())
    }

    async fn panics(_input: InputRecord, _ctx: ExecutionContext) -> HandlerResult {
        let results: Vec<Blueprint> = Vec::new();
        Ok(results[3].clone().into())
    }

    async fn stray(_input: InputRecord, _ctx: ExecutionContext) -> HandlerResult {
        Ok(Blueprint::new("ip_address").into())
    }

    async fn hangs(_input: InputRecord, ctx: ExecutionContext) -> HandlerResult {
        ctx.cancellation().cancelled().await;
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(TransformOutput::None)
    }

    fn search() -> PluginDefinition {
        PluginDefinition::new("Search")
            .element(ElementSpec::text("Query"))
            .element(ElementSpec::dropdown(
                "Engine",
                [DropdownOption::new("a"), DropdownOption::new("b")],
            ))
            .transform(TransformDescriptor::new("To Results", to_result).with_edge_label("found"))
            .transform(TransformDescriptor::new("Nothing", nothing))
            .transform(TransformDescriptor::new("Counted", counted))
            .transform(TransformDescriptor::new("Faulty", faulty))
            .transform(TransformDescriptor::new("Panics", panics))
            .transform(TransformDescriptor::new("Stray", stray))
            .transform(TransformDescriptor::new("Hangs", hangs))
    }

    fn search_result() -> PluginDefinition {
        PluginDefinition::new("Search Result")
            .hidden()
            .element(ElementSpec::title("Result"))
            .element(ElementSpec::copy_text("URL"))
    }

    fn registry() -> Registry {
        Registry::load(&|| vec![search(), search_result()])
    }

    fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = registry();
        let err = registry
            .register(PluginDefinition::new("search").color("#000"))
            .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicatePlugin { name: "search".into() });
        assert_eq!(registry.get("search").unwrap().color(), crate::plugin::DEFAULT_COLOR);
        assert_eq!(registry.all_entities().len(), 2);
    }

    #[test]
    fn load_skips_bad_definitions() {
        let registry = Registry::load(&|| {
            vec![
                search(),
                PluginDefinition::new("Broken").color("red"),
                PluginDefinition::new("Search"),
                search_result(),
            ]
        });
        let names: Vec<_> = registry
            .all_entities()
            .into_iter()
            .map(PluginDescriptor::name)
            .collect();
        assert_eq!(names, ["search", "search_result"]);
        assert_eq!(registry.rejected().len(), 2);
        assert_eq!(registry.rejected()[0].plugin(), "broken");
    }

    #[test]
    fn hidden_entities_are_not_listed() {
        let registry = registry();
        let visible: Vec<_> = registry
            .list_entities()
            .into_iter()
            .map(PluginDescriptor::name)
            .collect();
        assert_eq!(visible, ["search"]);
        assert!(registry.get("Search Result").is_some());
    }

    #[test]
    fn transforms_list_in_declaration_order() {
        let registry = registry();
        let names: Vec<_> = registry
            .list_transforms("search")
            .unwrap()
            .iter()
            .map(TransformDescriptor::name)
            .collect();
        assert_eq!(names[..2], ["to_results", "nothing"]);
        assert!(matches!(
            registry.list_transforms("whois"),
            Err(NotFoundError::Entity { .. })
        ));
    }

    #[tokio::test]
    async fn invoke_normalizes_and_stamps_edge_label() {
        let out = registry()
            .invoke(
                "search",
                "To Results",
                &input(json!({"query": "rust"})),
                ExecutionContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity_name, "search_result");
        assert_eq!(out[0].edge_label.as_deref(), Some("found"));
        assert_eq!(
            Value::Object(out[0].properties.clone()),
            json!({
                "result_title": "rust",
                "result_subtitle": "S",
                "result_text": "X",
                "url": "https://example.com",
            })
        );
    }

    #[tokio::test]
    async fn empty_result_is_empty_sequence() {
        let out = registry()
            .invoke("search", "nothing", &Map::new(), ExecutionContext::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn plugin_error_passes_through() {
        let err = registry()
            .invoke("search", "to_results", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Plugin(_)));
        assert_eq!(err.user_message(), "Please provide a search query.");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_handler() {
        let before = CALLS.load(Ordering::SeqCst);
        let err = registry()
            .invoke(
                "search",
                "counted",
                &input(json!({"engine": "c"})),
                ExecutionContext::new(),
            )
            .await
            .unwrap_err();
        let InvokeError::Validation(v) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(v.errors[0].label, "Engine");
        assert_eq!(CALLS.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let registry = registry();
        let err = registry
            .invoke("whois", "lookup", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::NotFound(NotFoundError::Entity { .. })));

        let err = registry
            .invoke("search", "lookup", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::NotFound(NotFoundError::Transform { .. })));
    }

    #[tokio::test]
    async fn unexpected_errors_are_redacted() {
        let err = registry()
            .invoke("search", "faulty", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(!err.user_message().contains("invalid digit"));
    }

    /// Log sink for asserting on what an invocation logged.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn invoke_logged(transform: &str, raw: Value) -> (InvokeError, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let err = registry()
            .invoke("search", transform, &input(raw), ExecutionContext::new())
            .await
            .unwrap_err();
        (err, logs.text())
    }

    #[tokio::test]
    async fn internal_failures_are_logged_with_identity_and_cause() {
        let (err, logs) = invoke_logged("faulty", json!({"query": "secret-ish"})).await;
        let InvokeError::Internal { incident } = err else {
            panic!("expected internal error, got {err:?}");
        };
        let line = logs
            .lines()
            .find(|l| l.contains("transform failed unexpectedly"))
            .unwrap_or_else(|| panic!("no failure line in logs:\n{logs}"));
        assert!(line.contains("ERROR"));
        assert!(line.contains("search"));
        assert!(line.contains("faulty"));
        assert!(line.contains("invalid digit found in string"));
        assert!(line.contains("secret-ish"));
        assert!(line.contains(&incident.to_string()));
    }

    #[tokio::test]
    async fn plugin_errors_are_not_logged_as_internal_failures() {
        let (err, logs) = invoke_logged("to_results", json!({})).await;
        assert!(matches!(err, InvokeError::Plugin(_)));
        assert!(logs.contains("transform reported an error"));
        assert!(!logs.contains("transform failed unexpectedly"));
        assert!(!logs.contains("ERROR"));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let err = registry()
            .invoke("search", "panics", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Internal { .. }));
    }

    #[tokio::test]
    async fn unregistered_output_entity_is_definition_error() {
        let err = registry()
            .invoke("search", "stray", &Map::new(), ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Definition(DefinitionError::UnknownEntity { .. })
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_a_hanging_transform() {
        let token = CancellationToken::new();
        let registry = registry();
        let ctx = ExecutionContext::new().with_cancellation(token.clone());
        let empty = Map::new();
        let call = registry.invoke("search", "hangs", &empty, ctx);
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(call, canceller);
        assert!(matches!(result, Err(InvokeError::Cancelled)));
    }

    #[test]
    fn terminal_states() {
        assert!(InvocationState::Succeeded.is_terminal());
        assert!(InvocationState::RejectedInput.is_terminal());
        assert!(!InvocationState::Executing.is_terminal());
        assert_eq!(InvocationState::RejectedInput.to_string(), "rejected_input");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
