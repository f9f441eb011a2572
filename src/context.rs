//! Context type & delegates (C10).
//!
//! The context is a plain record threaded by value between pipeline stages.
//! The delegate set is the sole channel for side effects a stage must reach:
//! `enter`, `leave`, and `stream`. Front-ends supply whichever combination
//! they care about; the core never assumes any of the three is present.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::stage::StageEvent;

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A numbered search hit, as returned by the web-search client (C3).
///
/// `position` is 1-based and equals the insertion index used in
/// `[citation:position]` tokens the LLM is expected to produce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub position: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One completed pipeline run, appended to conversation history only after
/// the Respond stage has produced its final answer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    pub inquiry: String,
    pub thought: String,
    pub keyphrases: String,
    pub topic: String,
    pub references: Vec<Reference>,
    pub answer: String,
    pub duration_ms: u128,
    pub stages: Vec<StageEvent>,
}

/// Front-end-supplied side-effect hooks.
///
/// All three are optional; a stage calls through [`Delegates::enter`],
/// [`Delegates::leave`], and [`Delegates::stream`], each a no-op when the
/// corresponding hook wasn't supplied.
#[derive(Default, Clone)]
pub struct Delegates {
    enter: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    leave: Option<Arc<dyn Fn(&str, serde_json::Value) + Send + Sync>>,
    stream: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl Delegates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enter(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.enter = Some(Arc::new(f));
        self
    }

    pub fn with_leave(mut self, f: impl Fn(&str, serde_json::Value) + Send + Sync + 'static) -> Self {
        self.leave = Some(Arc::new(f));
        self
    }

    pub fn with_stream(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.stream = Some(Arc::new(f));
        self
    }

    pub fn enter(&self, stage: &str) {
        if let Some(f) = &self.enter {
            f(stage);
        }
    }

    pub fn leave(&self, stage: &str, fields: serde_json::Value) {
        if let Some(f) = &self.leave {
            f(stage, fields);
        }
    }

    pub fn stream(&self, delta: &str) {
        if let Some(f) = &self.stream {
            f(delta);
        }
    }
}

/// The value threaded through the Reason → Search → Respond pipeline.
///
/// Each stage takes ownership of a `Context` and returns a new one with its
/// own fields filled in; nothing is mutated behind the caller's back.
pub struct Context {
    pub inquiry: String,
    pub history: Vec<HistoryEntry>,
    pub delegates: Arc<Delegates>,

    pub language: Option<String>,
    pub topic: Option<String>,
    pub thought: Option<String>,
    pub keyphrases: Option<String>,
    pub observation: Option<String>,
    pub references: Vec<Reference>,
    pub answer: String,

    pub events: Vec<StageEvent>,
    start: Instant,
}

impl Context {
    pub fn new(inquiry: impl Into<String>, history: Vec<HistoryEntry>, delegates: Arc<Delegates>) -> Self {
        Self {
            inquiry: inquiry.into(),
            history,
            delegates,
            language: None,
            topic: None,
            thought: None,
            keyphrases: None,
            observation: None,
            references: Vec::new(),
            answer: String::new(),
            events: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Record an `enter` event for `stage` and invoke the enter delegate.
    pub fn enter_stage(&mut self, stage: &str) {
        self.delegates.enter(stage);
        self.events.push(StageEvent {
            name: stage.to_string(),
            timestamp_ms: self.start.elapsed().as_millis(),
            fields: None,
        });
    }

    /// Record a `leave` event for `stage` and invoke the leave delegate.
    pub fn leave_stage(&mut self, stage: &str, fields: serde_json::Value) {
        self.delegates.leave(stage, fields.clone());
        self.events.push(StageEvent {
            name: stage.to_string(),
            timestamp_ms: self.start.elapsed().as_millis(),
            fields: Some(fields),
        });
    }

    /// Emit a streamed text delta to the stream delegate.
    pub fn emit(&self, delta: &str) {
        self.delegates.stream(delta);
    }

    /// Build the [`HistoryEntry`] for this completed run.
    pub fn into_history_entry(self) -> HistoryEntry {
        HistoryEntry {
            inquiry: self.inquiry,
            thought: self.thought.unwrap_or_default(),
            keyphrases: self.keyphrases.unwrap_or_default(),
            topic: self.topic.unwrap_or_default(),
            references: self.references,
            answer: self.answer,
            duration_ms: self.start.elapsed().as_millis(),
            stages: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delegates_are_no_ops_when_absent() {
        let delegates = Delegates::new();
        delegates.enter("Reason");
        delegates.leave("Reason", serde_json::json!({}));
        delegates.stream("hi");
    }

    #[test]
    fn enter_and_leave_invoke_supplied_delegates() {
        let enters = Arc::new(AtomicUsize::new(0));
        let leaves = Arc::new(AtomicUsize::new(0));
        let e2 = enters.clone();
        let l2 = leaves.clone();

        let delegates = Arc::new(
            Delegates::new()
                .with_enter(move |_| {
                    e2.fetch_add(1, Ordering::SeqCst);
                })
                .with_leave(move |_, _| {
                    l2.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let mut ctx = Context::new("hello", vec![], delegates);
        ctx.enter_stage("Reason");
        ctx.leave_stage("Reason", serde_json::json!({"topic": "x"}));

        assert_eq!(enters.load(Ordering::SeqCst), 1);
        assert_eq!(leaves.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.events.len(), 2);
    }

    #[test]
    fn history_entry_defaults_absent_fields_to_empty_string() {
        let ctx = Context::new("q", vec![], Arc::new(Delegates::new()));
        let entry = ctx.into_history_entry();
        assert_eq!(entry.thought, "");
        assert_eq!(entry.keyphrases, "");
        assert_eq!(entry.topic, "");
        assert!(entry.references.is_empty());
    }
}
