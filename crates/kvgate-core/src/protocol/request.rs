//! Inbound payloads.

use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// `POST /set` body.
#[derive(Debug, Default, Deserialize)]
pub struct SetRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl SetRequest {
    /// Consume the request, yielding `(key, value)` when both are present.
    pub fn into_parts(self) -> Result<(String, String)> {
        let key = self.key.ok_or_else(|| missing("key"))?;
        let value = self.value.ok_or_else(|| missing("value"))?;
        Ok((key, value))
    }
}

/// `POST /delete` body.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub key: Option<String>,
}

impl DeleteRequest {
    pub fn into_key(self) -> Result<String> {
        self.key.ok_or_else(|| missing("key"))
    }
}

fn missing(field: &str) -> GatewayError {
    GatewayError::BadRequest(format!("missing field `{field}`"))
}

/// `GET /search` query string.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

impl SearchQuery {
    /// Resolve the match pattern. `prefix` wins when both are supplied;
    /// `None` when neither is.
    pub fn pattern(&self) -> Option<SearchPattern> {
        match (&self.prefix, &self.suffix) {
            (Some(p), _) => Some(SearchPattern::Prefix(p.clone())),
            (None, Some(s)) => Some(SearchPattern::Suffix(s.clone())),
            (None, None) => None,
        }
    }
}

/// Exact, case-sensitive key match. No wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPattern {
    Prefix(String),
    Suffix(String),
}

impl SearchPattern {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            SearchPattern::Prefix(p) => key.starts_with(p.as_str()),
            SearchPattern::Suffix(s) => key.ends_with(s.as_str()),
        }
    }
}
