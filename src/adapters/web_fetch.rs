//! `fetch_page` tool: download a page and return its readable text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};

use super::{Tool, ToolSpec};

pub const TOOL_NAME: &str = "fetch_page";

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "svg", "template"];

pub struct WebFetchTool {
    client: Client,
}

impl WebFetchTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_NAME.to_string(),
            description: "Fetch a web page and return its readable text content.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute URL of the page" }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let url = arguments
            .get("url")
            .and_then(Value::as_str)
            .context("fetch_page requires a 'url' argument")?;

        let html = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status for {}", url))?
            .text()
            .await
            .with_context(|| format!("Unable to read response body for {}", url))?;

        let text = readable_text(&html);
        if text.is_empty() {
            anyhow::bail!("No readable text at {}", url);
        }
        Ok(text)
    }
}

/// Visible text of the page's main content, whitespace collapsed.
///
/// Prefers `<main>`, then `<article>`, then `<body>`.
pub fn readable_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = ["main", "article", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next());

    let Some(root) = root else {
        return String::new();
    };

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_main_content() {
        let html = r#"<html><body>
            <nav>Home | About</nav>
            <main><h1>Demo   Night</h1><p>Doors open at 7pm.</p></main>
            <footer>Copyright</footer>
        </body></html>"#;

        assert_eq!(readable_text(html), "Demo Night Doors open at 7pm.");
    }

    #[test]
    fn test_skips_scripts_and_styles() {
        let html = r#"<html><body>
            <script>var tracking = true;</script>
            <style>p { color: red }</style>
            <p>Visible text</p>
        </body></html>"#;

        assert_eq!(readable_text(html), "Visible text");
    }

    #[test]
    fn test_spec_requires_url() {
        let tool = WebFetchTool::new(Client::new());
        let spec = tool.spec();
        assert_eq!(spec.name, TOOL_NAME);
        assert_eq!(spec.parameters["required"][0], "url");
    }

    #[tokio::test]
    async fn test_call_without_url_fails() {
        let tool = WebFetchTool::new(Client::new());
        assert!(tool.call(&json!({})).await.is_err());
    }
}
