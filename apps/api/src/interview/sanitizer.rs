//! Extraction Sanitizer: turns raw extractor text into candidate updates.
//!
//! The extractor is asked for a JSON array but routinely returns fenced,
//! truncated, or concatenated output. Rather than parsing the whole text as one
//! document, the sanitizer scans for brace-delimited objects and parses each in
//! isolation, so one bad object never costs the rest of the batch.
//!
//! This never fails: unusable input yields an empty list and a log line.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::interview::models::CandidateUpdate;

/// Parses every well-formed candidate object in `raw` and stamps each with `now`.
pub fn sanitize(raw: &str, now: DateTime<Utc>) -> Vec<CandidateUpdate> {
    let text = strip_code_fences(raw);
    let (spans, roots) = scan_objects(&text);

    if roots.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() && trimmed != "[]" {
            warn!("No candidate objects found in extractor output: {}", preview(trimmed));
        }
        return Vec::new();
    }

    // Outermost spans first. A span that is malformed, or valid but names no
    // item (a wrapper such as {"updates": [...]}), gives way to its children.
    let mut candidates = Vec::new();
    let mut pending: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(idx) = pending.pop() {
        let span = &spans[idx];
        let fragment = &text[span.start..=span.end];
        match serde_json::from_str::<CandidateUpdate>(fragment) {
            Ok(mut candidate) if !candidate.item.is_empty() => {
                candidate.last_updated = Some(now);
                candidates.push(candidate);
            }
            _ if !span.children.is_empty() => {
                pending.extend(span.children.iter().rev());
            }
            Ok(_) => debug!("Dropping candidate without an item: {}", preview(fragment)),
            Err(e) => warn!("Dropping malformed candidate fragment: {} ({e})", preview(fragment)),
        }
    }

    debug!("Sanitized {} candidate update(s)", candidates.len());
    candidates
}

/// Removes ```json / ``` fence markers wherever they appear.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// A balanced `{...}` span, by byte offsets of its braces, and the balanced
/// spans directly inside it.
#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
    children: Vec<usize>,
}

/// Finds every balanced `{...}` span in one pass over `text`.
///
/// Returns the spans and the indices of the top-level ones in document order.
/// Braces inside string literals are ignored; quotes only count inside an
/// object. Objects left open at the end of the text (truncated output) are not
/// spans themselves, but the complete objects inside them are promoted to the
/// top level.
fn scan_objects(text: &str) -> (Vec<Span>, Vec<usize>) {
    let mut spans = Vec::new();
    let mut roots = Vec::new();
    let mut open: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push((i, Vec::new())),
            '}' => {
                if let Some((start, children)) = open.pop() {
                    let idx = spans.len();
                    spans.push(Span {
                        start,
                        end: i,
                        children,
                    });
                    match open.last_mut() {
                        Some((_, siblings)) => siblings.push(idx),
                        None => roots.push(idx),
                    }
                }
            }
            _ => {}
        }
    }

    if !open.is_empty() {
        warn!(
            "Extractor output ends inside {} unterminated object(s)",
            open.len()
        );
        for (_, children) in open {
            roots.extend(children);
        }
    }

    (spans, roots)
}

/// First 200 characters, for log lines.
fn preview(text: &str) -> String {
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 9, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_fenced_array_is_parsed() {
        let raw = "```json\n[\n  {\"item\": \"우울감\", \"status\": \"answered\", \"score\": 2, \"freq_or_intensity\": \"3일\", \"raw_user_input\": \"요즘 좀 우울해\"}\n]\n```";
        let out = sanitize(raw, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item, "우울감");
        assert_eq!(out[0].score, Some(2));
    }

    #[test]
    fn test_timestamp_is_overwritten() {
        let raw = r#"[{"item": "피로감", "last_updated": "2020-01-01T00:00:00Z"}]"#;
        let out = sanitize(raw, now());
        assert_eq!(out[0].last_updated, Some(now()));
    }

    #[test]
    fn test_malformed_fragment_does_not_drop_batch() {
        let raw = r#"[
            {"item": "수면 문제", "score": 1},
            {"item": "피로감", "score": },
            {"item": "우울감", "score": 3}
        ]"#;
        let items: Vec<_> = sanitize(raw, now()).into_iter().map(|c| c.item).collect();
        assert_eq!(items, vec!["수면 문제", "우울감"]);
    }

    #[test]
    fn test_truncated_tail_keeps_complete_objects() {
        let raw = r#"[{"item": "수면 문제", "score": 1}, {"item": "피로감", "sco"#;
        let out = sanitize(raw, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item, "수면 문제");
    }

    #[test]
    fn test_unclosed_object_swallowing_neighbour_is_recovered() {
        let raw = r#"{"item": "a", "score": 1 {"item": "b", "score": 2}}"#;
        let out = sanitize(raw, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item, "b");
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let raw = r#"{"item": "우울감", "raw_user_input": "기분이 {별로} 야 \"}\""}"#;
        let out = sanitize(raw, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_user_input.as_deref(), Some("기분이 {별로} 야 \"}\""));
    }

    #[test]
    fn test_prose_without_objects_yields_empty() {
        assert!(sanitize("Sorry, I cannot help with that.", now()).is_empty());
        assert!(sanitize("", now()).is_empty());
        assert!(sanitize("[]", now()).is_empty());
    }

    #[test]
    fn test_object_without_usable_item_is_dropped() {
        let raw = r#"{"item": ["not", "a", "label"]} {"item": "우울감"}"#;
        let items: Vec<_> = sanitize(raw, now()).into_iter().map(|c| c.item).collect();
        assert_eq!(items, vec!["우울감"]);
    }

    #[test]
    fn test_wrapped_candidates_are_unwrapped() {
        let raw = r#"{"updates": [
            {"item": "우울감", "status": "answered", "score": 2, "freq_or_intensity": "3일", "raw_user_input": "우울해"},
            {"item": "피로감", "raw_user_input": "피곤해"}
        ]}"#;
        let out = sanitize(raw, now());
        let items: Vec<_> = out.iter().map(|c| c.item.as_str()).collect();
        assert_eq!(items, vec!["우울감", "피로감"]);
        assert_eq!(out[0].score, Some(2));
        assert!(out.iter().all(|c| c.last_updated == Some(now())));
    }

    #[test]
    fn test_valid_candidate_keeps_nested_objects_whole() {
        let raw = r#"{"item": "피로감", "meta": {"item": "우울감"}}"#;
        let items: Vec<_> = sanitize(raw, now()).into_iter().map(|c| c.item).collect();
        assert_eq!(items, vec!["피로감"]);
    }

    #[test]
    fn test_deep_brace_runs_yield_nothing() {
        assert!(sanitize(&"{".repeat(100_000), now()).is_empty());
        let balanced = "{".repeat(50_000) + &"}".repeat(50_000);
        assert!(sanitize(&balanced, now()).is_empty());
    }

    #[test]
    fn test_deep_nesting_does_not_hide_inner_candidate() {
        let raw = "{".repeat(10_000) + r#"{"item": "우울감", "score": 1}"#;
        let out = sanitize(&raw, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item, "우울감");
    }

    #[test]
    fn test_scan_tracks_nesting_and_truncation() {
        let (spans, roots) = scan_objects(r#"{"a": {"b": 1}} {"c": {"d": 2}, "#);
        assert_eq!(roots.len(), 2);
        let first = &spans[roots[0]];
        assert_eq!((first.start, first.end), (0, 14));
        assert_eq!(first.children.len(), 1);
        let promoted = &spans[roots[1]];
        assert_eq!((promoted.start, promoted.end), (22, 29));
    }
}
