//! Event records scraped from the listing page and their identifiers.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder stored in any record field the extractor could not fill.
pub const NOT_FOUND: &str = "not found";

/// One event as extracted from the listing page.
///
/// Every field is best-effort; any of them may hold [`NOT_FOUND`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub hosts: String,
    pub date_time: String,
    pub location: String,
    pub image_url: String,
    pub event_url: String,
    pub price: String,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            title: NOT_FOUND.to_string(),
            hosts: NOT_FOUND.to_string(),
            date_time: NOT_FOUND.to_string(),
            location: NOT_FOUND.to_string(),
            image_url: NOT_FOUND.to_string(),
            event_url: NOT_FOUND.to_string(),
            price: NOT_FOUND.to_string(),
        }
    }
}

impl EventRecord {
    /// Identifier derived from `event_url`, if the URL has a usable last segment
    pub fn event_id(&self) -> Option<EventId> {
        EventId::from_url(&self.event_url).ok()
    }

    /// Case-insensitive substring match on title, hosts and location
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }

        [&self.title, &self.hosts, &self.location]
            .iter()
            .filter(|field| field.as_str() != NOT_FOUND)
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Primary key shared by every per-event store.
///
/// It is the trailing path segment of the event's canonical URL and is
/// restricted to characters that are safe as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

/// Why a string could not become an [`EventId`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEventId {
    #[error("event id is empty")]
    Empty,

    #[error("event id contains illegal characters: {0}")]
    IllegalCharacters(String),

    #[error("event url has no path segment: {0}")]
    NoPathSegment(String),

    #[error("event url contains control characters: {0:?}")]
    ControlCharacters(String),
}

/// Canonical form of an event URL as stored in artifacts and journal keys.
///
/// Surrounding whitespace is dropped; embedded control characters are
/// rejected since the URL is written into single-line headers.
pub fn normalize_event_url(raw: &str) -> Result<String, InvalidEventId> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(InvalidEventId::Empty);
    }
    if url.chars().any(char::is_control) {
        return Err(InvalidEventId::ControlCharacters(url.to_string()));
    }
    Ok(url.to_string())
}

impl EventId {
    /// Validate a raw identifier
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidEventId> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(InvalidEventId::Empty);
        }

        let legal = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !legal || trimmed.starts_with('.') {
            return Err(InvalidEventId::IllegalCharacters(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Derive the identifier from an event URL's last path segment.
    ///
    /// Query strings and fragments are ignored, as is a trailing slash.
    pub fn from_url(event_url: &str) -> Result<Self, InvalidEventId> {
        let segment = match Url::parse(event_url.trim()) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string),
            // Relative links ("/abc123") still carry the id
            Err(_) => event_url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.split('/').filter(|s| !s.is_empty()).last())
                .map(str::to_string),
        };

        match segment {
            Some(segment) => Self::new(segment),
            None => Err(InvalidEventId::NoPathSegment(event_url.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for EventId {
    type Error = InvalidEventId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl std::str::FromStr for EventId {
    type Err = InvalidEventId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
