//! Parsing of selector responses into highlight candidates.
//!
//! The response as a whole must be JSON (optionally fenced as markdown);
//! anything else is `ProviderInvalidResponse`. Individual entries are
//! validated one by one and malformed entries are dropped with a warning.

use serde_json::{Map, Value};

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_media_model::HighlightCandidate;

pub const DEFAULT_HOOK: &str = "Key highlight";
pub const DEFAULT_SUMMARY: &str = "Important point from the content.";
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

const START_KEYS: &[&str] = &["start_time", "start_seconds", "start"];
const END_KEYS: &[&str] = &["end_time", "end_seconds", "end"];

/// Parse raw model output into candidates.
///
/// Accepts a bare array, a `{"highlights": [...]}` wrapper, or a single
/// highlight object. An empty result is not an error.
pub fn parse_candidates(provider: &str, raw: &str) -> ReelResult<Vec<HighlightCandidate>> {
    let body = strip_code_fence(raw);
    let value = parse_json(body).ok_or_else(|| {
        let excerpt: String = body.chars().take(200).collect();
        ReelError::invalid_response(provider, format!("response is not JSON: {excerpt}"))
    })?;

    let entries = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("highlights") {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None if has_any(&map, START_KEYS) => vec![Value::Object(map)],
            None => {
                return Err(ReelError::invalid_response(
                    provider,
                    "JSON object has no highlights",
                ))
            }
        },
        other => {
            return Err(ReelError::invalid_response(
                provider,
                format!("expected an array of highlights, got {}", json_kind(&other)),
            ))
        }
    };

    let total = entries.len();
    let candidates: Vec<HighlightCandidate> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match parse_entry(&entry) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                tracing::warn!(provider, entry = i, reason, "Dropping malformed highlight entry");
                None
            }
        })
        .collect();

    tracing::debug!(provider, total, usable = candidates.len(), "Parsed selector response");
    Ok(candidates)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_json(body: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(body) {
        return Some(value);
    }
    // Prose around an array: take the outermost brackets.
    let start = body.find('[')?;
    let end = body.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

fn parse_entry(entry: &Value) -> Result<HighlightCandidate, &'static str> {
    let map = entry.as_object().ok_or("entry is not an object")?;

    let start = lookup_number(map, START_KEYS).ok_or("missing or non-numeric start_time")?;
    let end = lookup_number(map, END_KEYS).ok_or("missing or non-numeric end_time")?;

    let hook = lookup_text(map, "hook").unwrap_or(DEFAULT_HOOK);
    let summary = lookup_text(map, "summary").unwrap_or(DEFAULT_SUMMARY);
    let confidence = lookup_number(map, &["confidence"])
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    Ok(HighlightCandidate::new(start, end, confidence).with_text(hook, summary))
}

fn has_any(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|k| map.contains_key(*k))
}

fn lookup_number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let value = keys.iter().find_map(|k| map.get(*k))?;
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('s').parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn lookup_text<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_array() {
        let raw = r#"[
            {"start_time": 12.5, "end_time": 28.3, "hook": "Wow", "summary": "Line one.", "confidence": 0.95},
            {"start_time": 40, "end_time": 55, "hook": "Again", "summary": "Line two.", "confidence": 0.7}
        ]"#;
        let candidates = parse_candidates("test", raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].hook, "Wow");
        assert!((candidates[0].start_secs - 12.5).abs() < 1e-9);
        assert!((candidates[1].end_secs - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_code_fence_and_wrapper() {
        let raw = "```json\n{\"highlights\": [{\"start_time\": 1, \"end_time\": 9}]}\n```";
        let candidates = parse_candidates("test", raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].hook, DEFAULT_HOOK);
        assert_eq!(candidates[0].summary, DEFAULT_SUMMARY);
        assert!((candidates[0].confidence - DEFAULT_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_single_object_and_aliases() {
        let raw = r#"{"start_seconds": "10.5", "end_seconds": "20s", "confidence": 3}"#;
        let candidates = parse_candidates("test", raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].start_secs - 10.5).abs() < 1e-9);
        assert!((candidates[0].end_secs - 20.0).abs() < 1e-9);
        assert!((candidates[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_entries_are_dropped_not_fatal() {
        let raw = r#"[
            {"start_time": 1, "end_time": 9},
            {"end_time": 30},
            {"start_time": "soon", "end_time": 40},
            "not an object",
            {"start_time": 50, "end_time": 60, "hook": "   "}
        ]"#;
        let candidates = parse_candidates("test", raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].hook, DEFAULT_HOOK);
    }

    #[test]
    fn test_empty_array_is_empty_result() {
        assert!(parse_candidates("test", "[]").unwrap().is_empty());
        assert!(parse_candidates("test", r#"{"highlights": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_prose_around_array() {
        let raw = "Here you go:\n[{\"start_time\": 3, \"end_time\": 11}]\nEnjoy!";
        assert_eq!(parse_candidates("test", raw).unwrap().len(), 1);
    }

    #[test]
    fn test_non_json_is_invalid_response() {
        let err = parse_candidates("test", "I could not find any highlights.").unwrap_err();
        assert!(matches!(err, ReelError::ProviderInvalidResponse { .. }));
        assert!(!err.is_retryable());

        let err = parse_candidates("test", "42").unwrap_err();
        assert!(matches!(err, ReelError::ProviderInvalidResponse { .. }));
    }
}
