//! Request Module
//!
//! One observed HTTP transaction, from capture to audit evidence.
//!
//! ## Lifecycle
//! - created by the producer with raw fields populated
//! - threat map written once by the classification pipeline
//! - identifier and timestamp assigned once by the audit store
//! - never mutated afterwards
//!
//! ## Structure
//! - `types`: ThreatLabel, Location, ThreatMap
//! - `headers`: captured header list and name matching

pub mod headers;
pub mod types;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use headers::HEADER_FIELDS;
pub use types::{valid_verdict, Location, ThreatLabel, ThreatMap, UnknownVariant};

/// One observed HTTP request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    /// Assigned by the audit store
    #[serde(skip_deserializing)]
    id: Option<i64>,
    /// Capture time, assigned by the audit store
    #[serde(skip_deserializing)]
    timestamp: Option<DateTime<Utc>>,

    pub origin: String,
    pub host: String,
    /// Request line / path
    pub request: String,
    #[serde(default)]
    pub body: Option<String>,
    pub method: String,

    #[serde(default, deserialize_with = "deserialize_headers")]
    headers: HashMap<String, String>,

    /// Written by the classification pipeline
    #[serde(skip_deserializing)]
    threats: ThreatMap,
}

impl Request {
    pub fn new(
        origin: impl Into<String>,
        host: impl Into<String>,
        method: impl Into<String>,
        request: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            host: host.into(),
            method: method.into(),
            request: request.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Record a captured header.
    ///
    /// Only names from `HEADER_FIELDS` are kept, stored under their canonical
    /// spelling. Empty values and the literal `None` are dropped. Returns
    /// whether the header was kept.
    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() || value == "None" {
            return false;
        }
        match headers::canonical_name(name) {
            Some(canonical) => {
                self.headers.insert(canonical.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Header value by name (case-insensitive, `_` accepted for `-`)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| headers::same_header(key, name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn threats(&self) -> &ThreatMap {
        &self.threats
    }

    pub fn is_classified(&self) -> bool {
        !self.threats.is_empty()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Body text, treating an empty body as absent
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    /// Raw text of every inspected field, in scan order:
    /// request line, body, Cookie, User-Agent, Accept-Encoding, Accept-Language.
    /// Absent or empty fields are skipped.
    pub fn inspected_fields(&self) -> Vec<(Location, &str)> {
        let header_fields = [
            (Location::Cookie, headers::COOKIE),
            (Location::UserAgent, headers::USER_AGENT),
            (Location::AcceptEncoding, headers::ACCEPT_ENCODING),
            (Location::AcceptLanguage, headers::ACCEPT_LANGUAGE),
        ];

        let mut fields = Vec::with_capacity(6);
        if !self.request.is_empty() {
            fields.push((Location::Request, self.request.as_str()));
        }
        if let Some(body) = self.body_text() {
            fields.push((Location::Body, body));
        }
        for (location, name) in header_fields {
            if let Some(value) = self.header(name).filter(|v| !v.is_empty()) {
                fields.push((location, value));
            }
        }
        fields
    }

    /// Check the producer contract before classification
    pub fn validate(&self) -> Result<(), String> {
        if self.method.is_empty() || !self.method.bytes().all(is_token_char) {
            return Err(format!("invalid HTTP method: {:?}", self.method));
        }
        if self.request.is_empty() {
            return Err("empty request line".to_string());
        }
        if self.origin.is_empty() {
            return Err("missing origin address".to_string());
        }
        Ok(())
    }

    /// Raw snapshot document: non-empty request line, body and headers
    pub fn snapshot(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        if !self.request.is_empty() {
            doc.insert("request".into(), self.request.clone().into());
        }
        if let Some(body) = self.body_text() {
            doc.insert("body".into(), body.to_string().into());
        }
        for (name, value) in &self.headers {
            if !value.is_empty() {
                doc.insert(name.clone(), value.clone().into());
            }
        }
        serde_json::Value::Object(doc)
    }

    pub(crate) fn set_threats(&mut self, threats: ThreatMap) {
        self.threats = threats;
    }

    pub(crate) fn mark_persisted(&mut self, id: i64, timestamp: DateTime<Utc>) {
        self.id = Some(id);
        self.timestamp = Some(timestamp);
    }
}

/// RFC 7230 `tchar`
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    let mut request = Request::default();
    for (name, value) in raw {
        request.insert_header(&name, value);
    }
    Ok(request.headers)
}
