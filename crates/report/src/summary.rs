//! Human-readable one-line summaries of parsed violations.
use crate::types::ParsedViolation;

const MAX_SAMPLE_CHARS: usize = 100;

/// Render a pipe-separated single-line summary of a violation.
///
/// Parts appear in a fixed order and only when non-empty: directive, blocked
/// URI (with parenthetical expansion for the special pseudo-URIs), document,
/// source location, and a truncated script sample.
pub(crate) fn summarize(parsed: Option<&ParsedViolation>) -> String {
    let Some(parsed) = parsed else {
        return "Failed to parse CSP report".to_string();
    };

    let mut parts = Vec::new();

    if !parsed.violated_directive.is_empty() {
        parts.push(format!("Violated directive: {}", parsed.violated_directive));
    } else if !parsed.effective_directive.is_empty() {
        parts.push(format!(
            "Effective directive: {}",
            parsed.effective_directive
        ));
    }

    if !parsed.blocked_uri.is_empty() {
        let blocked = match parsed.blocked_uri.as_str() {
            "inline" => "inline (inline script or style)".to_string(),
            "eval" => "eval (eval() or similar)".to_string(),
            "data" => "data (data: URI)".to_string(),
            "blob" => "blob (blob: URI)".to_string(),
            "filesystem" => "filesystem (filesystem: URI)".to_string(),
            other => other.to_string(),
        };
        parts.push(format!("Blocked URI: {blocked}"));
    }

    if !parsed.document_uri.is_empty() {
        parts.push(format!("Document: {}", parsed.document_uri));
    }

    if !parsed.source_file.is_empty() {
        let mut location = parsed.source_file.clone();
        if let Some(line) = parsed.line_number {
            location.push_str(&format!(":{line}"));
        }
        if let Some(column) = parsed.column_number {
            location.push_str(&format!(":{column}"));
        }
        parts.push(format!("Source: {location}"));
    }

    if !parsed.script_sample.is_empty() {
        let sample = if parsed.script_sample.chars().count() > MAX_SAMPLE_CHARS {
            let truncated: String = parsed.script_sample.chars().take(MAX_SAMPLE_CHARS).collect();
            format!("{truncated}...")
        } else {
            parsed.script_sample.clone()
        };
        parts.push(format!("Script sample: {sample}"));
    }

    if parts.is_empty() {
        return "CSP violation (no details available)".to_string();
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_parts_in_fixed_order() {
        let parsed = ParsedViolation {
            document_uri: "https://example.com/page".into(),
            violated_directive: "script-src 'self'".into(),
            blocked_uri: "https://evil.example/x.js".into(),
            source_file: "https://example.com/app.js".into(),
            line_number: Some(10),
            column_number: Some(4),
            script_sample: "alert(1)".into(),
            ..Default::default()
        };

        assert_eq!(
            summarize(Some(&parsed)),
            "Violated directive: script-src 'self' | \
             Blocked URI: https://evil.example/x.js | \
             Document: https://example.com/page | \
             Source: https://example.com/app.js:10:4 | \
             Script sample: alert(1)"
        );
    }

    #[test]
    fn effective_directive_used_when_violated_missing() {
        let parsed = ParsedViolation {
            effective_directive: "style-src-elem".into(),
            ..Default::default()
        };
        assert_eq!(
            summarize(Some(&parsed)),
            "Effective directive: style-src-elem"
        );
    }

    #[test]
    fn special_blocked_uris_are_expanded() {
        for (uri, expected) in [
            ("inline", "Blocked URI: inline (inline script or style)"),
            ("eval", "Blocked URI: eval (eval() or similar)"),
            ("data", "Blocked URI: data (data: URI)"),
            ("blob", "Blocked URI: blob (blob: URI)"),
            ("filesystem", "Blocked URI: filesystem (filesystem: URI)"),
        ] {
            let parsed = ParsedViolation {
                blocked_uri: uri.into(),
                ..Default::default()
            };
            assert_eq!(summarize(Some(&parsed)), expected);
        }
    }

    #[test]
    fn source_location_appends_only_present_parts() {
        let parsed = ParsedViolation {
            source_file: "app.js".into(),
            line_number: Some(3),
            ..Default::default()
        };
        assert_eq!(summarize(Some(&parsed)), "Source: app.js:3");
    }

    #[test]
    fn long_script_sample_is_truncated() {
        let parsed = ParsedViolation {
            script_sample: "x".repeat(150),
            ..Default::default()
        };
        let summary = summarize(Some(&parsed));
        assert_eq!(summary, format!("Script sample: {}...", "x".repeat(100)));
    }

    #[test]
    fn empty_violation_has_fallback_text() {
        assert_eq!(
            summarize(Some(&ParsedViolation::default())),
            "CSP violation (no details available)"
        );
    }

    #[test]
    fn null_violation_has_failure_text() {
        assert_eq!(summarize(None), "Failed to parse CSP report");
    }
}
