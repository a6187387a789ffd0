//! Listing-page extraction from schema.org JSON-LD.
//!
//! Event platforms embed `Event` objects in
//! `<script type="application/ld+json">` blocks, either directly, inside an
//! `@graph`, or as `ItemList` entries. Fields that are missing become
//! [`NOT_FOUND`].

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{EventRecord, NOT_FOUND};

use super::EventSource;

/// Scrapes a listing page over HTTP
pub struct JsonLdEventSource {
    url: String,
    client: Client,
}

impl JsonLdEventSource {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    async fn fetch_html(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Non-success status for {}", self.url))?;

        response
            .text()
            .await
            .with_context(|| format!("Unable to read response body for {}", self.url))
    }
}

#[async_trait]
impl EventSource for JsonLdEventSource {
    fn source_url(&self) -> &str {
        &self.url
    }

    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        let html = self.fetch_html().await?;
        let events = extract_events(&html, &self.url);
        info!(url = %self.url, count = events.len(), "Extracted events from listing page");
        Ok(events)
    }
}

/// Extract every schema.org event in `html`, deduplicated by URL
pub fn extract_events(html: &str, base_url: &str) -> Vec<EventRecord> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let value = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON-LD block");
                continue;
            }
        };

        let mut nodes = Vec::new();
        collect_event_nodes(&value, &mut nodes);

        for node in nodes {
            let record = to_record(node, base.as_ref());
            if record.event_url == NOT_FOUND || seen.insert(record.event_url.clone()) {
                events.push(record);
            }
        }
    }

    events
}

fn is_event_type(node: &Value) -> bool {
    let matches = |t: &str| t == "Event" || t.ends_with("Event");
    match node.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn collect_event_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_event_nodes(item, out);
            }
        }
        Value::Object(map) => {
            if is_event_type(value) {
                out.push(value);
                return;
            }
            for key in ["@graph", "itemListElement", "item"] {
                if let Some(child) = map.get(key) {
                    collect_event_nodes(child, out);
                }
            }
        }
        _ => {}
    }
}

fn to_record(node: &Value, base: Option<&Url>) -> EventRecord {
    let event_url = node
        .get("url")
        .and_then(text)
        .and_then(|href| absolute_url(base, &href))
        .unwrap_or_else(|| NOT_FOUND.to_string());

    EventRecord {
        title: node.get("name").and_then(text).unwrap_or_else(not_found),
        hosts: hosts(node).unwrap_or_else(not_found),
        date_time: node.get("startDate").and_then(text).unwrap_or_else(not_found),
        location: node.get("location").and_then(location).unwrap_or_else(not_found),
        image_url: node.get("image").and_then(image).unwrap_or_else(not_found),
        event_url,
        price: node.get("offers").and_then(price).unwrap_or_else(not_found),
    }
}

fn not_found() -> String {
    NOT_FOUND.to_string()
}

/// Trimmed, whitespace-collapsed text of a scalar
fn text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => value.get("name").and_then(text),
        other => text(other),
    }
}

fn names(value: &Value) -> Option<String> {
    let list: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(name_of).collect(),
        other => name_of(other).into_iter().collect(),
    };
    (!list.is_empty()).then(|| list.join(", "))
}

fn hosts(node: &Value) -> Option<String> {
    node.get("organizer")
        .and_then(names)
        .or_else(|| node.get("performer").and_then(names))
}

fn location(value: &Value) -> Option<String> {
    if let Value::Array(items) = value {
        return items.iter().find_map(location);
    }
    if let Some(plain) = text(value) {
        return Some(plain);
    }

    if value.get("@type").and_then(Value::as_str) == Some("VirtualLocation") {
        return Some("Online".to_string());
    }

    let name = value.get("name").and_then(text);
    let address = value.get("address").and_then(|address| match address {
        Value::Object(_) => {
            let parts: Vec<String> = ["streetAddress", "addressLocality", "addressRegion"]
                .iter()
                .filter_map(|key| address.get(*key).and_then(text))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => text(other),
    });

    match (name, address) {
        (Some(name), Some(address)) if address.contains(&name) => Some(address),
        (Some(name), Some(address)) => Some(format!("{}, {}", name, address)),
        (Some(name), None) => Some(name),
        (None, address) => address,
    }
}

fn image(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(image),
        Value::Object(_) => value.get("url").and_then(text),
        other => text(other),
    }
}

fn price(value: &Value) -> Option<String> {
    let offer = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };

    let amount = offer
        .get("price")
        .or_else(|| offer.get("lowPrice"))
        .and_then(text)?;
    if amount.parse::<f64>().map(|p| p == 0.0).unwrap_or(false) {
        return Some("Free".to_string());
    }

    match offer.get("priceCurrency").and_then(text) {
        Some(currency) => Some(format!("{} {}", amount, currency)),
        None => Some(amount),
    }
}

fn absolute_url(base: Option<&Url>, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    base?.join(href).ok().map(|u| u.to_string())
}
