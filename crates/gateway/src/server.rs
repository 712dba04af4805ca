use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{Path, Query, State},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    serde_json::{Map, Value, json},
    sleuth_config::SleuthConfig,
    sleuth_plugins::{NotFoundError, PluginSource, raw_input_from_elements},
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use crate::{error::ApiError, state::GatewayState};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the service router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/entities", get(list_entities_handler))
        .route("/entities/{name}", get(entity_handler))
        .route("/entities/{name}/transforms", get(list_transforms_handler))
        .route(
            "/entities/{name}/transforms/{transform}",
            post(invoke_handler),
        )
        .route("/refresh", post(refresh_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the plugin service and serve until Ctrl-C.
///
/// On shutdown every running invocation is cancelled before the listener
/// drains.
pub async fn start_server(
    config: &SleuthConfig,
    source: Arc<dyn PluginSource>,
) -> anyhow::Result<()> {
    let browser = sleuth_browser::browser_pool(&config.browser)?;
    if browser.is_none() {
        info!("browser capability disabled");
    }
    let state = GatewayState::new(source, config.plugins.clone(), browser);
    let app = build_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = %state.version, "plugin service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: Arc<GatewayState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutting down");
    state.shutdown();
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let registry = state.registry().await;
    let status = if state.is_shutting_down() {
        "stopping"
    } else {
        "ok"
    };
    Json(json!({
        "status": status,
        "version": state.version,
        "entities": registry.catalog().len(),
        "rejected": registry.rejected().len(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    /// Include hidden entities.
    #[serde(default)]
    all: bool,
}

async fn list_entities_handler(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let registry = state.registry().await;
    let entities = if params.all {
        registry.all_entities()
    } else {
        registry.list_entities()
    };
    Json(entities).into_response()
}

async fn entity_handler(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let registry = state.registry().await;
    let plugin = registry
        .get(&name)
        .ok_or(NotFoundError::Entity { entity: name })?;
    Ok(Json(json!({
        "entity": plugin,
        "blueprint": plugin.template(),
    }))
    .into_response())
}

async fn list_transforms_handler(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let registry = state.registry().await;
    let transforms = registry.list_transforms(&name)?;
    Ok(Json(transforms).into_response())
}

/// Body of an invocation request.
///
/// Input comes either as a flat `input` map or as the node's `elements`
/// array as the graph sends it; keys in `input` win when both are given.
#[derive(Debug, Default, Deserialize)]
struct InvokeRequest {
    #[serde(default)]
    input: Map<String, Value>,
    #[serde(default)]
    elements: Vec<Value>,
}

async fn invoke_handler(
    State(state): State<Arc<GatewayState>>,
    Path((name, transform)): Path<(String, String)>,
    Json(body): Json<InvokeRequest>,
) -> Result<Response, ApiError> {
    let registry = state.registry().await;
    let mut raw = raw_input_from_elements(&body.elements);
    raw.extend(body.input);

    let settings_key = registry
        .get(&name)
        .map_or_else(|| name.clone(), |p| p.name().to_string());
    let ctx = state.context_for(&settings_key);

    let blueprints = registry.invoke(&name, &transform, &raw, ctx).await?;
    Ok(Json(json!({
        "entity": settings_key,
        "transform": transform,
        "blueprints": blueprints,
    }))
    .into_response())
}

async fn refresh_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let registry = state.reload().await;
    let rejected: Vec<Value> = registry
        .rejected()
        .iter()
        .map(|e| json!({ "plugin": e.plugin(), "error": e.to_string() }))
        .collect();
    Json(json!({
        "loaded": registry.catalog().len(),
        "rejected": rejected,
    }))
}
