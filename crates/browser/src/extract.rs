//! HTML reduction: title, visible text, links.

use {regex::Regex, sleuth_plugins::Link, url::Url};

use crate::error::BrowserError;

/// Compiled patterns for pulling page content out of HTML.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    title: Regex,
    anchor: Regex,
    hidden: Regex,
    tag: Regex,
    block: Regex,
}

impl PageExtractor {
    pub fn new() -> Result<Self, BrowserError> {
        Ok(Self {
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>")?,
            anchor: Regex::new(
                r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#,
            )?,
            hidden: Regex::new(
                r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->",
            )?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            block: Regex::new(r"(?i)<(?:br|p|div|li|tr|h[1-6])\b[^>]*>|</(?:p|div|li|tr|h[1-6])\s*>")?,
        })
    }

    /// Contents of `<title>`, whitespace collapsed.
    pub fn title(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| collapse(&decode_entities(m.as_str())))
            .filter(|t| !t.is_empty())
    }

    /// Visible text, one line per block element.
    pub fn text(&self, html: &str) -> String {
        let visible = self.hidden.replace_all(html, " ");
        let broken = self.block.replace_all(&visible, "\n");
        let stripped = self.tag.replace_all(&broken, " ");
        decode_entities(&stripped)
            .lines()
            .map(collapse)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `http(s)` links resolved against `base`, first occurrence of each href.
    pub fn links(&self, html: &str, base: &Url) -> Vec<Link> {
        let mut links: Vec<Link> = Vec::new();
        for caps in self.anchor.captures_iter(html) {
            let Some(raw) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let Ok(href) = base.join(decode_entities(raw.as_str()).trim()) else {
                continue;
            };
            if !matches!(href.scheme(), "http" | "https") {
                continue;
            }
            let href = href.to_string();
            if links.iter().any(|l| l.href == href) {
                continue;
            }
            let inner = caps.get(3).map_or("", |m| m.as_str());
            let text = collapse(&decode_entities(&self.tag.replace_all(inner, " ")));
            links.push(Link { href, text });
        }
        links
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
