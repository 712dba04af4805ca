//! Web search and search result entities.

use {
    serde_json::{Value, json},
    sleuth_plugins::{
        Blueprint, ElementSpec, ExecutionContext, InputRecord, Link, PluginDefinition,
        TransformDescriptor, TransformError, TransformOutput,
    },
    tracing::debug,
    url::Url,
};

use crate::web::host_of;

/// Query URL prefix of the default engine; the encoded query is appended.
/// Overridden by the `engine` setting.
pub const DEFAULT_ENGINE: &str = "https://html.duckduckgo.com/html/?q=";

const RESULTS_PER_PAGE: usize = 10;
const MAX_PAGES: i64 = 5;

pub fn search() -> PluginDefinition {
    PluginDefinition::new("Search")
        .color("#3D78D9")
        .icon("search")
        .author("OSIB")
        .description("Search the web for a query")
        .row([
            ElementSpec::text("Query")
                .with_icon("search")
                .with_placeholder("Find me..."),
            ElementSpec::number("Pages").with_default(1),
        ])
        .transform(TransformDescriptor::new("To Results", search_to_results).with_icon("list"))
}

pub fn search_result() -> PluginDefinition {
    PluginDefinition::new("Search Result")
        .hidden()
        .color("#308E49")
        .icon("brand-google")
        .author("OSIB")
        .element(ElementSpec::title("Result"))
        .element(ElementSpec::copy_text("URL"))
        .transform(TransformDescriptor::new("To Website", result_to_website).with_icon("world"))
        .transform(TransformDescriptor::new("To URL", result_to_url).with_icon("link"))
}

async fn search_to_results(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let query = input
        .text("query")
        .ok_or_else(|| TransformError::plugin("Please provide a search query."))?;
    let pages = input.integer("pages").unwrap_or(1).clamp(1, MAX_PAGES);
    let limit = usize::try_from(pages).unwrap_or(1) * RESULTS_PER_PAGE;

    let engine: String = ctx
        .setting("engine")
        .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let engine_host = host_of(&engine);

    let browser = ctx.browser()?;
    let page = browser.session().await?.load(&format!("{engine}{encoded}")).await?;
    debug!(links = page.links.len(), status = page.status, "search page loaded");

    let mut results: Vec<Blueprint> = Vec::new();
    for link in &page.links {
        if results.len() >= limit {
            break;
        }
        let Some(target) = resolve_redirect(&link.href) else {
            continue;
        };
        let host = host_of(target.as_str());
        if host.is_none() || host == engine_host || link.text.is_empty() {
            continue;
        }
        results.push(result_blueprint(&ctx, link, &target, host.unwrap_or_default())?);
    }
    Ok(results.into())
}

fn result_blueprint(
    ctx: &ExecutionContext,
    link: &Link,
    target: &Url,
    host: String,
) -> Result<Blueprint, TransformError> {
    Ok(ctx.blueprint("search_result", [
        (
            "result",
            json!({
                "title": link.text,
                "subtitle": host,
                "text": target.path(),
            }),
        ),
        ("url", json!(target.as_str())),
    ])?)
}

/// Unwrap engine redirect links (`/l/?uddg=<target>`) to their target.
fn resolve_redirect(href: &str) -> Option<Url> {
    let url = Url::parse(href).ok()?;
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .and_then(|(_, v)| Url::parse(&v).ok());
    Some(target.unwrap_or(url))
}

async fn result_to_website(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let domain = record_url(&input)
        .and_then(host_of)
        .ok_or_else(|| TransformError::plugin("This result has no URL."))?;
    Ok(ctx.blueprint("website", [("domain", json!(domain))])?.into())
}

async fn result_to_url(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let url = record_url(&input).ok_or_else(|| TransformError::plugin("This result has no URL."))?;
    Ok(ctx.blueprint("url", [("url", json!(url))])?.into())
}

/// Search results only carry display elements, so the URL is read from what
/// the node shows rather than from an input field.
fn record_url(input: &InputRecord) -> Option<&str> {
    input
        .displayed("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
}
