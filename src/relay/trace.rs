//! Loop-prevention trace header.
//!
//! Every relay appends its own ID to `X-Relay-Trace` when forwarding and
//! checks for its own ID on receipt. A relay that sees itself in the trace
//! refuses to forward again, which stops cycles after one extra hop.
//!
//! The trace has no length or hop cap.

use axum::http::{HeaderMap, HeaderName};

/// Header carrying the comma-separated list of relay IDs a request has passed through.
pub const TRACE_HEADER: HeaderName = HeaderName::from_static("x-relay-trace");

/// Returns true if `relay_id` is one of the comma-separated entries of `trace`.
pub fn contains(trace: &str, relay_id: &str) -> bool {
    let relay_id = relay_id.trim();
    if relay_id.is_empty() {
        return false;
    }
    trace.split(',').any(|segment| segment.trim() == relay_id)
}

/// Append `relay_id` to the end of `trace`.
///
/// Blank segments are dropped and the remaining order is preserved.
pub fn append(trace: &str, relay_id: &str) -> String {
    let relay_id = relay_id.trim();
    if relay_id.is_empty() {
        return trace.to_string();
    }

    let mut segments: Vec<&str> = trace
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    segments.push(relay_id);
    segments.join(",")
}

/// Read the trace from a header map, joining repeated header lines with commas.
///
/// Non-UTF-8 bytes are replaced rather than dropping the whole line, so every
/// segment of every line is kept.
pub fn from_headers(headers: &HeaderMap) -> String {
    headers
        .get_all(&TRACE_HEADER)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_append_builds_ordered_list() {
        assert_eq!(append(&append("", "a"), "b"), "a,b");
        assert_eq!(append("a,b", "c"), "a,b,c");
    }

    #[test]
    fn test_append_empty_id_is_noop() {
        for trace in ["", "a", " a , ,b ", ",,"] {
            assert_eq!(append(trace, ""), trace);
            assert_eq!(append(trace, "   "), trace);
        }
    }

    #[test]
    fn test_append_cleans_segments() {
        assert_eq!(append(" a , ,b,", " c "), "a,b,c");
        assert_eq!(append(",,", "x"), "x");
    }

    #[test]
    fn test_contains() {
        assert!(contains("a,b,c", "b"));
        assert!(contains(" a , b ", "b"));
        assert!(contains("a,b", " a "));
        assert!(!contains("a,b,c", ""));
        assert!(!contains("", "a"));
        assert!(!contains("ab,c", "a"));
    }

    #[test]
    fn test_from_headers_joins_lines() {
        let mut headers = HeaderMap::new();
        assert_eq!(from_headers(&headers), "");

        headers.append(TRACE_HEADER, HeaderValue::from_static("a,b"));
        headers.append(TRACE_HEADER, HeaderValue::from_static("c"));
        let trace = from_headers(&headers);
        assert!(contains(&trace, "c"));
        assert_eq!(append(&trace, "d"), "a,b,c,d");
    }

    #[test]
    fn test_from_headers_keeps_lines_with_opaque_bytes() {
        let mut headers = HeaderMap::new();
        headers.append(TRACE_HEADER, HeaderValue::from_static("upstream"));
        headers.append(TRACE_HEADER, HeaderValue::from_bytes(b"selfid,\xe9x").unwrap());

        let trace = from_headers(&headers);
        assert!(contains(&trace, "selfid"));
        assert!(contains(&trace, "upstream"));

        let outbound = append(&trace, "next");
        assert_eq!(outbound.split(',').count(), 4);
        assert!(outbound.starts_with("upstream,selfid,"));
        assert!(outbound.ends_with(",next"));
        assert!(HeaderValue::from_str(&outbound).is_ok());
    }
}
