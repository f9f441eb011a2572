//! Stage-event recorder & review (C7).
//!
//! Each stage emits one `enter` event on start and one `leave` event on
//! success, appended to [`Context::events`]. `simplify` pairs them up by
//! adjacent index — event `2i` is the enter, event `2i+1` the matching leave
//! — not by name, since a stage produces exactly two events per invocation.
//!
//! [`Context::events`]: crate::context::Context

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEvent {
    pub name: String,
    pub timestamp_ms: u128,
    pub fields: Option<serde_json::Value>,
}

/// A completed stage: name, wall-clock duration, and the fields attached to
/// its `leave` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub name: String,
    pub duration_ms: u128,
    pub fields: Option<serde_json::Value>,
}

/// Pair up enter/leave events by adjacent index into one summary per stage.
///
/// An odd-length or otherwise malformed event list is a programming error
/// in the pipeline driver (every stage must emit exactly one enter and one
/// matching leave); trailing unmatched events are dropped rather than
/// panicking, since review is a best-effort diagnostic.
pub fn simplify(events: &[StageEvent]) -> Vec<StageSummary> {
    events
        .chunks_exact(2)
        .map(|pair| {
            let enter = &pair[0];
            let leave = &pair[1];
            StageSummary {
                name: leave.name.clone(),
                duration_ms: leave.timestamp_ms.saturating_sub(enter.timestamp_ms),
                fields: leave.fields.clone(),
            }
        })
        .collect()
}

/// Pretty-print a stage summary list: one line per stage with name,
/// duration, and leave fields.
pub fn review(events: &[StageEvent]) -> String {
    simplify(events)
        .iter()
        .map(|s| {
            let fields = s
                .fields
                .as_ref()
                .map(|v| serde_json::to_string(v).unwrap_or_default())
                .unwrap_or_default();
            format!("{} ({}ms) {}", s.name, s.duration_ms, fields)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, ts: u128, fields: Option<serde_json::Value>) -> StageEvent {
        StageEvent { name: name.to_string(), timestamp_ms: ts, fields }
    }

    #[test]
    fn simplify_pairs_by_adjacent_index_not_name() {
        let events = vec![
            event("Reason", 0, None),
            event("Reason", 10, Some(serde_json::json!({"topic": "t"}))),
            event("Search", 10, None),
            event("Search", 25, Some(serde_json::json!({"hits": 1}))),
        ];

        let summaries = simplify(&events);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Reason");
        assert_eq!(summaries[0].duration_ms, 10);
        assert_eq!(summaries[1].name, "Search");
        assert_eq!(summaries[1].duration_ms, 15);
    }

    #[test]
    fn simplify_returns_one_summary_per_stage_with_non_negative_duration() {
        let events: Vec<StageEvent> =
            (0..6).map(|i| event("S", i * 5, None)).collect();
        let summaries = simplify(&events);
        assert_eq!(summaries.len(), 3);
        assert!(summaries.iter().all(|s| s.duration_ms == 5));
    }

    #[test]
    fn review_renders_one_line_per_stage() {
        let events = vec![
            event("Reason", 0, None),
            event("Reason", 5, Some(serde_json::json!({"topic": "x"}))),
        ];
        let out = review(&events);
        assert!(out.contains("Reason"));
        assert!(out.contains("5ms"));
    }
}
