//! Username and username profile entities.

use {
    serde_json::json,
    sleuth_plugins::{
        Blueprint, ElementSpec, ExecutionContext, InputRecord, PluginDefinition,
        TransformDescriptor, TransformError, TransformOutput,
    },
    tracing::debug,
};

/// Profile URL templates probed for a username; `{}` is the username.
/// Overridden by the `sites` setting.
pub const DEFAULT_SITES: &[&str] = &[
    "https://github.com/{}",
    "https://gitlab.com/{}",
    "https://www.reddit.com/user/{}",
    "https://keybase.io/{}",
    "https://news.ycombinator.com/user?id={}",
];

pub fn username() -> PluginDefinition {
    PluginDefinition::new("Username")
        .color("#BF288D")
        .icon("user-search")
        .author("OSIB")
        .author("Artemii")
        .description("Investigate usernames used as identification")
        .element(ElementSpec::text("Username").with_icon("user-search").required())
        .transform(
            TransformDescriptor::new("To Profiles", username_to_profiles)
                .with_icon("user")
                .with_edge_label("registered_at"),
        )
}

pub fn username_profile() -> PluginDefinition {
    PluginDefinition::new("Username Profile")
        .hidden()
        .color("#D842A6")
        .icon("user-scan")
        .author("OSIB")
        .element(ElementSpec::text("Profile Link").with_icon("link").required())
        .transform(TransformDescriptor::new("To URL", profile_to_url).with_icon("link"))
}

async fn username_to_profiles(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let name = input
        .text("username")
        .filter(|n| !n.contains(char::is_whitespace))
        .ok_or_else(|| TransformError::plugin("Please provide a username without spaces."))?;
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let sites: Vec<String> = ctx
        .setting("sites")
        .unwrap_or_else(|| DEFAULT_SITES.iter().map(|s| (*s).to_string()).collect());

    let browser = ctx.browser()?;
    let session = browser.session().await?;
    let mut profiles: Vec<Blueprint> = Vec::new();
    for template in sites {
        let link = template.replace("{}", &encoded);
        match session.load(&link).await {
            Ok(page) if (200..300).contains(&page.status) => {
                profiles.push(ctx.blueprint("username_profile", [("profile_link", json!(link))])?);
            },
            Ok(page) => debug!(url = %link, status = page.status, "no profile"),
            Err(e) => debug!(url = %link, error = %e, "profile check failed"),
        }
    }
    Ok(profiles.into())
}

async fn profile_to_url(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let link = input
        .text("profile_link")
        .ok_or_else(|| TransformError::plugin("Please provide a profile link."))?;
    Ok(ctx.blueprint("url", [("url", json!(link))])?.into())
}

#[cfg(test)]
mod tests {
    use {serde_json::Map, sleuth_plugins::InvokeError};

    use {
        super::*,
        crate::testing::{self, FakeLoader},
    };

    #[tokio::test]
    async fn registered_profiles_become_blueprints() {
        let loader = FakeLoader::default()
            .page("https://github.com/octo", 200, &[])
            .page("https://keybase.io/octo", 200, &[])
            .page("https://gitlab.com/octo", 404, &[]);
        let out = testing::registry()
            .invoke(
                "username",
                "to_profiles",
                &testing::input(json!({"username": "octo"})),
                testing::context(loader),
            )
            .await
            .unwrap();
        let links: Vec<_> = out
            .iter()
            .map(|bp| bp.properties["profile_link"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(links, ["https://github.com/octo", "https://keybase.io/octo"]);
        assert!(out.iter().all(|bp| bp.entity_name == "username_profile"));
        assert!(out.iter().all(|bp| bp.edge_label.as_deref() == Some("registered_at")));
    }

    #[tokio::test]
    async fn sites_setting_overrides_defaults() {
        let loader = FakeLoader::default().page("https://example.com/~octo", 200, &[]);
        let mut settings = Map::new();
        settings.insert("sites".into(), json!(["https://example.com/~{}"]));
        let out = testing::registry()
            .invoke(
                "username",
                "to_profiles",
                &testing::input(json!({"username": "octo"})),
                testing::context(loader).with_settings(settings),
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn without_browser_the_failure_is_internal() {
        let err = testing::registry()
            .invoke(
                "username",
                "to_profiles",
                &testing::input(json!({"username": "octo"})),
                ExecutionContext::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[tokio::test]
    async fn spaces_are_a_plugin_error() {
        let err = testing::registry()
            .invoke(
                "username",
                "to_profiles",
                &testing::input(json!({"username": "two words"})),
                testing::context(FakeLoader::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Plugin(_)));
    }

    #[tokio::test]
    async fn profile_resolves_to_url() {
        let out = testing::registry()
            .invoke(
                "Username Profile",
                "To URL",
                &testing::input(json!({"Profile Link": "https://github.com/octo"})),
                ExecutionContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(out[0].entity_name, "url");
        assert_eq!(out[0].properties["url"], "https://github.com/octo");
    }
}
