//! Conversation history store (A4).
//!
//! A thin owned wrapper over `Vec<HistoryEntry>` for the terminal and HTTP
//! front-ends, plus a per-chat-id map for Telegram. Mutated only at
//! end-of-pipeline (append); `/reset` and `/review` are the only other
//! operations.

use std::collections::HashMap;

use crate::context::HistoryEntry;
use crate::stage;

/// Per-process conversation history, as owned by the terminal and HTTP
/// front-ends.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Pretty-print the stage-event log of the most recent entry, or a
    /// placeholder if history is empty.
    pub fn review(&self) -> String {
        match self.entries.last() {
            Some(entry) => stage::review(&entry.stages),
            None => "No history yet.".to_string(),
        }
    }
}

/// Per-chat-id conversation history, as owned by the Telegram front-end.
#[derive(Debug, Default)]
pub struct ChatHistories {
    by_chat: HashMap<i64, History>,
}

impl ChatHistories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_mut(&mut self, chat_id: i64) -> &mut History {
        self.by_chat.entry(chat_id).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(inquiry: &str) -> HistoryEntry {
        HistoryEntry { inquiry: inquiry.to_string(), ..Default::default() }
    }

    #[test]
    fn reset_clears_all_entries() {
        let mut history = History::new();
        history.push(entry("a"));
        history.push(entry("b"));
        history.reset();
        assert!(history.entries().is_empty());
    }

    #[test]
    fn review_reports_placeholder_when_empty() {
        let history = History::new();
        assert_eq!(history.review(), "No history yet.");
    }

    #[test]
    fn chat_histories_are_isolated_per_chat_id() {
        let mut histories = ChatHistories::new();
        histories.get_mut(1).push(entry("a"));
        histories.get_mut(2).push(entry("b"));
        assert_eq!(histories.get_mut(1).entries().len(), 1);
        assert_eq!(histories.get_mut(2).entries().len(), 1);
    }
}
