//! Page loading over plain HTTP.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    sleuth_config::BrowserConfig,
    sleuth_plugins::{BrowserPool, Page, PageLoader},
    tracing::debug,
    url::Url,
};

use crate::{error::BrowserError, extract::PageExtractor};

/// Fetches pages with `reqwest` and extracts their content.
#[derive(Debug, Clone)]
pub struct HttpPageLoader {
    client: reqwest::Client,
    extractor: PageExtractor,
}

impl HttpPageLoader {
    pub fn new(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            extractor: PageExtractor::new()?,
        })
    }

    /// Fetch `url` and reduce it to a [`Page`].
    ///
    /// Non-success statuses are not errors; the page carries the status.
    pub async fn fetch(&self, url: &str) -> Result<Page, BrowserError> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {},
            s => return Err(BrowserError::UnsupportedScheme(s.to_string())),
        }

        let resp = self.client.get(url.as_str()).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        let is_html = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("html"));
        let body = resp.text().await?;
        debug!(url = %final_url, status, bytes = body.len(), "page loaded");

        if !is_html {
            return Ok(Page {
                url: final_url.to_string(),
                status,
                title: None,
                text: body,
                links: Vec::new(),
            });
        }

        Ok(Page {
            url: final_url.to_string(),
            status,
            title: self.extractor.title(&body),
            text: self.extractor.text(&body),
            links: self.extractor.links(&body, &final_url),
        })
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &str) -> anyhow::Result<Page> {
        Ok(self.fetch(url).await?)
    }
}

/// Session pool from config; `None` when the browser is disabled.
pub fn browser_pool(config: &BrowserConfig) -> Result<Option<BrowserPool>, BrowserError> {
    if !config.enabled {
        return Ok(None);
    }
    let loader = HttpPageLoader::new(config)?;
    Ok(Some(BrowserPool::new(Arc::new(loader), config.max_sessions)))
}

#[cfg(test)]
mod tests {
    use {
        axum::{Router, http::header, response::IntoResponse, routing::get},
        tokio::net::TcpListener,
    };

    use super::*;

    async fn serve() -> String {
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    (
                        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                        "<title>Home</title><p>Hello</p><a href=\"/next\">Next</a>",
                    )
                        .into_response()
                }),
            )
            .route("/plain", get(|| async { "just text" }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn loads_and_extracts_html() {
        let base = serve().await;
        let loader = HttpPageLoader::new(&BrowserConfig::default()).unwrap();
        let page = loader.fetch(&format!("{base}/")).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.title.as_deref(), Some("Home"));
        assert!(page.text.contains("Hello"));
        assert_eq!(page.links[0].href, format!("{base}/next"));
    }

    #[tokio::test]
    async fn non_html_is_returned_verbatim() {
        let base = serve().await;
        let loader = HttpPageLoader::new(&BrowserConfig::default()).unwrap();
        let page = loader.fetch(&format!("{base}/plain")).await.unwrap();
        assert_eq!(page.text, "just text");
        assert!(page.links.is_empty());

        let missing = loader.fetch(&format!("{base}/missing")).await.unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn rejects_unsupported_schemes() {
        let loader = HttpPageLoader::new(&BrowserConfig::default()).unwrap();
        assert!(matches!(
            loader.fetch("file:///etc/passwd").await,
            Err(BrowserError::UnsupportedScheme(s)) if s == "file"
        ));
        assert!(matches!(
            loader.fetch("not a url").await,
            Err(BrowserError::InvalidUrl(_))
        ));
    }

    #[test]
    fn disabled_browser_has_no_pool() {
        let config = BrowserConfig {
            enabled: false,
            ..BrowserConfig::default()
        };
        assert!(browser_pool(&config).unwrap().is_none());
        let pool = browser_pool(&BrowserConfig::default()).unwrap().unwrap();
        assert_eq!(pool.max_sessions(), 2);
    }
}
