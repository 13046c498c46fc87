//! Field extraction for the supported CSP report dialects.
//!
//! Browsers disagree on key casing and naming, so every canonical field is
//! resolved through a priority-ordered alias list. The lists are data, not
//! code: adding a newly observed spelling means appending one entry here.
use serde_json::{Map, Value};

use crate::types::ParsedViolation;

/// Alias tables, probed in order. The first present value of the expected
/// kind wins.
mod aliases {
    pub const DOCUMENT_URI: &[&str] = &[
        "documentURL",
        "document-url",
        "document-uri",
        "documentURI",
        "document_uri",
        "document_url",
    ];
    pub const REFERRER: &[&str] = &["referrer"];
    pub const VIOLATED_DIRECTIVE: &[&str] =
        &["violatedDirective", "violated-directive", "violated_directive"];
    pub const EFFECTIVE_DIRECTIVE: &[&str] = &[
        "effectiveDirective",
        "effective-directive",
        "effective_directive",
    ];
    pub const ORIGINAL_POLICY: &[&str] = &["originalPolicy", "original-policy", "original_policy"];
    pub const BLOCKED_URI: &[&str] = &[
        "blockedURL",
        "blockedURI",
        "blocked-url",
        "blocked-uri",
        "blocked_uri",
        "blocked_url",
    ];
    pub const SCRIPT_SAMPLE: &[&str] = &["sample", "script-sample", "scriptSample", "script_sample"];
    pub const SOURCE_FILE: &[&str] = &["sourceFile", "source-file", "source_file"];
    pub const DISPOSITION: &[&str] = &["disposition"];
    pub const STATUS_CODE: &[&str] = &["statusCode", "status-code", "status_code"];
    pub const LINE_NUMBER: &[&str] = &["lineNumber", "line-number", "line_number"];
    pub const COLUMN_NUMBER: &[&str] = &["columnNumber", "column-number", "column_number"];
    pub const SHA256: &[&str] = &["sha256"];
}

/// Extract the canonical violation from a violation object, whatever dialect
/// it arrived in. Required-field diagnostics are collected into
/// `ParsedViolation::errors`.
pub(crate) fn extract_violation(fields: &Map<String, Value>) -> ParsedViolation {
    let mut parsed = ParsedViolation {
        document_uri: string_field(fields, aliases::DOCUMENT_URI),
        referrer: string_field(fields, aliases::REFERRER),
        violated_directive: string_field(fields, aliases::VIOLATED_DIRECTIVE),
        original_policy: string_field(fields, aliases::ORIGINAL_POLICY),
        blocked_uri: normalize_blocked_uri(string_field(fields, aliases::BLOCKED_URI)),
        status_code: int_field(fields, aliases::STATUS_CODE),
        script_sample: string_field(fields, aliases::SCRIPT_SAMPLE),
        line_number: int_field(fields, aliases::LINE_NUMBER),
        column_number: int_field(fields, aliases::COLUMN_NUMBER),
        source_file: string_field(fields, aliases::SOURCE_FILE),
        disposition: string_field(fields, aliases::DISPOSITION),
        effective_directive: string_field(fields, aliases::EFFECTIVE_DIRECTIVE),
        sha256: string_field(fields, aliases::SHA256),
        errors: Vec::new(),
    };

    if parsed.document_uri.is_empty() {
        parsed.errors.push("missing document-uri".to_string());
    }
    if parsed.violated_directive.is_empty() && parsed.effective_directive.is_empty() {
        parsed
            .errors
            .push("missing violated-directive or effective-directive".to_string());
    }

    // Newer dialects only send the effective directive.
    if parsed.violated_directive.is_empty() && !parsed.effective_directive.is_empty() {
        parsed.violated_directive = parsed.effective_directive.clone();
    }

    parsed
}

/// Probe the aliases in order and return the first string value found.
/// A present key holding a non-string does not stop the probe.
fn string_field(fields: &Map<String, Value>, aliases: &[&str]) -> String {
    for key in aliases {
        if let Some(Value::String(text)) = fields.get(*key) {
            return text.clone();
        }
    }
    String::new()
}

/// Probe the aliases in order for an integer-ish value. Accepts integers,
/// floats (truncated toward zero), and numeric strings. Empty and
/// non-numeric strings leave the field absent.
fn int_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<i64> {
    for key in aliases {
        let Some(value) = fields.get(*key) else {
            continue;
        };
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    return Some(int);
                }
                if let Some(float) = number.as_f64() {
                    return Some(float as i64);
                }
            }
            Value::String(text) if !text.is_empty() => {
                if let Ok(int) = text.parse::<i64>() {
                    return Some(int);
                }
            }
            _ => {}
        }
    }
    None
}

/// Normalize the special pseudo-URI values browsers put in `blocked-uri`.
pub(crate) fn normalize_blocked_uri(uri: String) -> String {
    if uri.is_empty() {
        return "inline".to_string();
    }

    match uri.to_lowercase().as_str() {
        "self" => "'self'".to_string(),
        "unsafe-eval" => "'unsafe-eval'".to_string(),
        "unsafe-inline" => "'unsafe-inline'".to_string(),
        _ => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(fields) => fields,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn alias_probe_order_prefers_earlier_spelling() {
        let fields = object(json!({
            "blocked-uri": "https://kebab.example/",
            "blockedURL": "https://camel.example/",
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.blocked_uri, "https://camel.example/");
    }

    #[test]
    fn non_string_value_does_not_stop_the_probe() {
        let fields = object(json!({
            "documentURL": 42,
            "document-uri": "https://example.com/page",
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.document_uri, "https://example.com/page");
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let fields = object(json!({
            "document-uri": "https://example.com/",
            "violated-directive": "img-src",
            "line-number": "42",
            "status-code": "200",
            "column-number": 7.9,
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.line_number, Some(42));
        assert_eq!(parsed.status_code, Some(200));
        assert_eq!(parsed.column_number, Some(7));
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn non_numeric_strings_stay_absent_without_diagnostics() {
        let fields = object(json!({
            "document-uri": "https://example.com/",
            "violated-directive": "img-src",
            "line-number": "not-a-number",
            "column-number": "",
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.line_number, None);
        assert_eq!(parsed.column_number, None);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn zero_is_distinguishable_from_absent() {
        let fields = object(json!({
            "document-uri": "https://example.com/",
            "violated-directive": "img-src",
            "line-number": 0,
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.line_number, Some(0));
        assert_eq!(parsed.column_number, None);
    }

    #[test]
    fn blocked_uri_special_values() {
        let cases = [
            ("", "inline"),
            ("self", "'self'"),
            ("SELF", "'self'"),
            ("unsafe-eval", "'unsafe-eval'"),
            ("UNSAFE-INLINE", "'unsafe-inline'"),
            ("https://evil.example/x.js", "https://evil.example/x.js"),
            ("data", "data"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_blocked_uri(input.to_string()), expected);
        }
    }

    #[test]
    fn missing_required_fields_are_diagnosed() {
        let parsed = extract_violation(&object(json!({})));
        assert_eq!(
            parsed.errors,
            vec![
                "missing document-uri".to_string(),
                "missing violated-directive or effective-directive".to_string(),
            ]
        );
        assert_eq!(parsed.blocked_uri, "inline");
    }

    #[test]
    fn effective_directive_fills_violated_directive() {
        let fields = object(json!({
            "document-uri": "https://example.com/",
            "effective-directive": "style-src-elem",
        }));
        let parsed = extract_violation(&fields);
        assert_eq!(parsed.violated_directive, "style-src-elem");
        assert_eq!(parsed.effective_directive, "style-src-elem");
        assert!(parsed.errors.is_empty());
    }
}
