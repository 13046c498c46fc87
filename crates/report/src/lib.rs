//! CSP Report Parsing - Dialect Normalization Layer
//!
//! This crate is the entry point of the CSP ingest pipeline: it turns a raw
//! request body plus transport metadata into canonical [`CspReport`] records
//! ready for batching and storage.
//!
//! # Pipeline Position
//!
//! ```text
//! HTTP body ──▶ Report ──▶ Pipeline (batching) ──▶ Storage (bulk index)
//!                 ↑
//!             (this crate)
//! ```
//!
//! # Supported dialects
//!
//! Browsers have shipped several wire shapes over the years, and all of them
//! are accepted here:
//!
//! - the legacy `{"csp-report": {...}}` wrapper (Chrome, Safari)
//! - the camelCase `{"cspReport": {...}}` variant (older Firefox/WebKit)
//! - a single Reporting API object `{"type": "csp-violation", "body": {...}}`
//! - a Reporting API batch array of such objects
//! - a bare violation object with no wrapper at all
//!
//! Key spelling varies too (`blocked-uri`, `blockedURI`, `blockedURL`, ...),
//! so each canonical field is resolved through a priority-ordered alias
//! table, and integer fields tolerate numeric strings.
//!
//! # Error model
//!
//! [`parse`] fails only when the body is not a JSON object or array. Every
//! structurally valid violation produces exactly one record: missing fields
//! become entries in [`CspReport::processing_errors`], and a malformed array
//! element becomes a stub record so the output count always matches the
//! input count (monitoring relies on that cardinality).
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;

mod error;
mod extract;
mod summary;
mod types;

use crate::extract::extract_violation;
use crate::summary::summarize;

pub use crate::error::ParseError;
pub use crate::types::{BrowserType, CspReport, ParsedViolation};

/// Parse a request body into canonical report records.
///
/// Returns one record per violation the body syntactically describes: one
/// for a single object, one per element for an array. Invalid array elements
/// yield stub records carrying an `invalid report format at index N`
/// diagnostic rather than being dropped.
///
/// # Errors
///
/// [`ParseError::InvalidJson`] when the bytes are not valid JSON, and
/// [`ParseError::UnsupportedShape`] when the top level is a scalar. Both map
/// to a 400 at the HTTP layer; nothing else is fatal.
pub fn parse(
    raw: &[u8],
    user_agent: &str,
    remote_addr: &str,
) -> Result<Vec<CspReport>, ParseError> {
    let value: Value = serde_json::from_slice(raw)?;

    let reports = match value {
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(fields) => parse_violation(fields, user_agent, remote_addr),
                other => invalid_entry(index, other, user_agent, remote_addr),
            })
            .collect(),
        Value::Object(fields) => vec![parse_violation(fields, user_agent, remote_addr)],
        _ => return Err(ParseError::UnsupportedShape),
    };

    debug!(count = reports.len(), "parsed csp report payload");
    Ok(reports)
}

/// Parse one violation object, whichever dialect it uses.
fn parse_violation(fields: Map<String, Value>, user_agent: &str, remote_addr: &str) -> CspReport {
    let parsed = if fields.get("type").and_then(Value::as_str) == Some("csp-violation") {
        // Reporting API envelope: the violation lives in `body`.
        match fields.get("body").and_then(Value::as_object) {
            Some(body) => extract_violation(body),
            None => ParsedViolation::with_errors(vec![
                "Report-To format missing body field".to_string()
            ]),
        }
    } else {
        extract_violation(nested_violation(&fields))
    };

    let human_readable = summarize(Some(&parsed));
    build_report(
        parsed,
        Value::Object(fields),
        human_readable,
        user_agent,
        remote_addr,
    )
}

/// Stub record for a non-object array element. Cardinality is preserved so
/// malformed batches stay visible downstream.
fn invalid_entry(index: usize, entry: Value, user_agent: &str, remote_addr: &str) -> CspReport {
    let parsed =
        ParsedViolation::with_errors(vec![format!("invalid report format at index {index}")]);
    let human_readable = summarize(None);
    build_report(parsed, entry, human_readable, user_agent, remote_addr)
}

fn build_report(
    parsed: ParsedViolation,
    raw: Value,
    human_readable: String,
    user_agent: &str,
    remote_addr: &str,
) -> CspReport {
    CspReport {
        id: generate_id(),
        timestamp: Utc::now(),
        user_agent: user_agent.to_string(),
        remote_addr: remote_addr.to_string(),
        browser_type: BrowserType::from_user_agent(user_agent),
        human_readable,
        processing_errors: parsed.errors.clone(),
        parsed,
        raw,
    }
}

/// Resolve the legacy wrapper keys, falling back to the object itself.
fn nested_violation(fields: &Map<String, Value>) -> &Map<String, Value> {
    for wrapper in ["csp-report", "cspReport", "body"] {
        if let Some(Value::Object(inner)) = fields.get(wrapper) {
            return inner;
        }
    }
    fields
}

/// Nanosecond UTC timestamp as an opaque id. Monotonically non-decreasing
/// within a process; the sink tolerates same-tick collisions.
fn generate_id() -> String {
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .to_string()
}
