//! Website and URL entities.

use {
    serde_json::json,
    sleuth_plugins::{
        ElementSpec, ExecutionContext, InputRecord, PluginDefinition, TransformDescriptor,
        TransformError, TransformOutput,
    },
    url::Url,
};

pub fn website() -> PluginDefinition {
    PluginDefinition::new("Website")
        .color("#1D1DAD")
        .icon("world-www")
        .author("OSIB")
        .description("A website reachable under a domain name")
        .element(
            ElementSpec::text("Domain")
                .with_icon("world-www")
                .with_placeholder("example.com")
                .required(),
        )
        .transform(TransformDescriptor::new("To URL", website_to_url).with_icon("link"))
}

pub fn url() -> PluginDefinition {
    PluginDefinition::new("URL")
        .color("#642CA9")
        .icon("link")
        .author("OSIB")
        .description("Uniform Resource Locator, usually starts with https://")
        .element(
            ElementSpec::text("URL")
                .with_icon("link")
                .with_placeholder("https://")
                .required(),
        )
        .transform(TransformDescriptor::new("To Website", url_to_website).with_icon("world-www"))
}

async fn website_to_url(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let domain = input
        .text("domain")
        .and_then(host_of)
        .ok_or_else(|| TransformError::plugin("Please provide a valid domain."))?;
    let bp = ctx.blueprint("url", [("url", json!(format!("https://{domain}")))])?;
    Ok(bp.into())
}

async fn url_to_website(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let domain = input
        .text("url")
        .and_then(host_of)
        .ok_or_else(|| TransformError::plugin("Please provide a valid URL."))?;
    Ok(ctx.blueprint("website", [("domain", json!(domain))])?.into())
}

/// Host part of a URL or bare domain; `https://` is assumed when no scheme
/// is given.
pub(crate) fn host_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("https://{raw}")).ok())?;
    parsed
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
        .filter(|h| !h.is_empty())
}
