//! Core data model types for the `report` crate.
//!
//! These types represent one normalized CSP violation record as it flows from
//! the parser through the batching pipeline into storage.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Browser family derived from the `User-Agent` header at ingest time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Unknown,
}

impl BrowserType {
    /// Classify a user-agent string. Order matters: Edge ships a `Chrome/`
    /// token and Chrome ships a `Safari/` token, so the more specific
    /// families are probed first.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("edg/") || ua.contains("edge/") {
            BrowserType::Edge
        } else if ua.contains("firefox") {
            BrowserType::Firefox
        } else if ua.contains("safari") && !ua.contains("chrome") {
            BrowserType::Safari
        } else if ua.contains("chrome") {
            BrowserType::Chrome
        } else {
            BrowserType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "chrome",
            BrowserType::Firefox => "firefox",
            BrowserType::Safari => "safari",
            BrowserType::Edge => "edge",
            BrowserType::Unknown => "unknown",
        }
    }
}

impl Default for BrowserType {
    fn default() -> Self {
        BrowserType::Unknown
    }
}

/// The canonical violation extracted from any of the supported wire dialects.
///
/// Field identity is fixed regardless of how the browser spelled the keys
/// (`blocked-uri`, `blockedURI`, `blockedURL`, ...). The three counters are
/// optional so that "absent" stays distinguishable from "present and zero".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedViolation {
    pub document_uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub referrer: String,
    pub violated_directive: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_policy: String,
    pub blocked_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub script_sample: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub disposition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub effective_directive: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sha256: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ParsedViolation {
    /// Stub violation for entries that carried no extractable data.
    ///
    /// `blocked_uri` is set to `"inline"` so the invariant that it is never
    /// empty on output holds for stub records too.
    pub(crate) fn with_errors(errors: Vec<String>) -> Self {
        Self {
            blocked_uri: "inline".to_string(),
            errors,
            ..Self::default()
        }
    }
}

/// One normalized CSP report as produced by [`crate::parse`] and persisted by
/// the storage sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CspReport {
    /// Opaque unique id, monotonically non-decreasing within a process.
    pub id: String,
    /// Wall-clock time of acceptance, UTC.
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub remote_addr: String,
    pub browser_type: BrowserType,
    /// The canonical violation. Always present; stub records carry empty
    /// fields plus populated `errors`.
    pub parsed: ParsedViolation,
    /// The original request-body value for this violation, kept verbatim for
    /// debugging malformed submissions.
    pub raw: serde_json::Value,
    /// Single-line human summary of the violation.
    pub human_readable: String,
    /// Diagnostics collected while parsing. Mirrors `parsed.errors`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processing_errors: Vec<String>,
}
