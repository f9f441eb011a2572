//! File-based test runner.
//!
//! Grammar: one directive per line, `ROLE: content`; `#` begins an
//! end-of-line comment; blank lines are ignored. `Story` resets history and
//! prints a banner; `User` runs the pipeline; `Assistant`,
//! `Pipeline.Reason.Keyphrases`, and `Pipeline.Reason.Topic` each check the
//! most recent pipeline run against a matcher (C9). An unrecognized role
//! aborts the run.

use std::path::Path;
use std::sync::Arc;

use crate::context::{Delegates, HistoryEntry};
use crate::error::{GamalError, Result};
use crate::history::History;
use crate::matcher::Matcher;
use crate::pipeline::Pipeline;

pub struct TestRunner {
    pipeline: Pipeline,
    fail_exit: bool,
}

impl TestRunner {
    pub fn new(pipeline: Pipeline, fail_exit: bool) -> Self {
        Self { pipeline, fail_exit }
    }

    /// Run every directive in `path` in order. Returns the process exit code:
    /// `0` if every expectation matched, `-1` on any failure, malformed
    /// directive, unknown role, or pipeline error.
    pub async fn run_file(&self, path: &Path) -> Result<i32> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GamalError::Config(format!("failed to read {}: {e}", path.display())))?;

        let mut history = History::new();
        let mut last_entry: Option<HistoryEntry> = None;
        let mut failures = 0u32;

        for (line_no, raw_line) in content.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let Some((role, directive)) = line.split_once(':') else {
                eprintln!("{}:{}: malformed directive: {line}", path.display(), line_no + 1);
                return Ok(-1);
            };
            let role = role.trim();
            let directive = directive.trim();

            match role {
                "Story" => {
                    history.reset();
                    last_entry = None;
                    println!("=== {directive} ===");
                }
                "User" => match self.pipeline.run(directive, history.entries().to_vec(), Arc::new(Delegates::new())).await {
                    Ok(entry) => {
                        last_entry = Some(entry.clone());
                        history.push(entry);
                    }
                    Err(err) => {
                        eprintln!("{}:{}: pipeline error: {err}", path.display(), line_no + 1);
                        return Ok(-1);
                    }
                },
                "Assistant" => {
                    if !self.check(path, line_no, directive, last_entry.as_ref().map(|e| e.answer.as_str()), &mut failures)? {
                        return Ok(-1);
                    }
                }
                "Pipeline.Reason.Keyphrases" => {
                    if !self.check(path, line_no, directive, last_entry.as_ref().map(|e| e.keyphrases.as_str()), &mut failures)? {
                        return Ok(-1);
                    }
                }
                "Pipeline.Reason.Topic" => {
                    if !self.check(path, line_no, directive, last_entry.as_ref().map(|e| e.topic.as_str()), &mut failures)? {
                        return Ok(-1);
                    }
                }
                other => {
                    eprintln!("{}:{}: unknown test role: {other}", path.display(), line_no + 1);
                    return Ok(-1);
                }
            }
        }

        Ok(if failures == 0 { 0 } else { -1 })
    }

    /// Match `target` (absent if no `User` line preceded this directive)
    /// against `expected`. Returns `Ok(false)` only when the caller should
    /// abort immediately (fail-exit debug flag set).
    fn check(
        &self,
        path: &Path,
        line_no: usize,
        expected: &str,
        target: Option<&str>,
        failures: &mut u32,
    ) -> Result<bool> {
        let target = target.unwrap_or("");
        let matcher = Matcher::compile(expected).map_err(|e| GamalError::TestMismatch(e.to_string()))?;

        if matcher.is_satisfied_by(target) {
            println!("{}:{}: PASS: {expected}", path.display(), line_no + 1);
        } else {
            *failures += 1;
            println!("{}:{}: FAIL: expected {expected}, got: {target}", path.display(), line_no + 1);
            if self.fail_exit {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comment_removes_trailing_hash_and_beyond() {
        assert_eq!(strip_comment("User: hello # a comment"), "User: hello ");
    }

    #[test]
    fn strip_comment_leaves_line_without_hash_untouched() {
        assert_eq!(strip_comment("User: hello"), "User: hello");
    }
}
