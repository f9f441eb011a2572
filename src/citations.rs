//! Citation rewriter (C8).
//!
//! Rewrites `[citation:N]` markers in a streamed answer into densely
//! renumbered `[k]` references, tolerating a marker split across two
//! separately-pushed chunks. Used by the terminal front-end, which pipes
//! every streamed delta through this before printing it.

/// Three times the width of `[citation:x]` (12 bytes), wide enough that a
/// marker straddling two chunks is always whole somewhere inside the window.
const LOOKAHEAD: usize = 36;

pub struct CitationRewriter {
    buffer: String,
    refs: Vec<char>,
}

impl CitationRewriter {
    pub fn new() -> Self {
        Self { buffer: String::new(), refs: Vec::new() }
    }

    /// Feed the next chunk of streamed text; returns the portion now safe to
    /// emit (i.e. far enough behind the lookahead window that no marker
    /// straddling it can still be completed by a later chunk).
    pub fn push(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        self.rewrite_markers();

        if self.buffer.len() > LOOKAHEAD {
            let cut = self.buffer.len() - LOOKAHEAD;
            let cut = floor_char_boundary(&self.buffer, cut);
            let emit = self.buffer[..cut].to_string();
            self.buffer = self.buffer[cut..].to_string();
            emit
        } else {
            String::new()
        }
    }

    /// Emit whatever remains, right-trimmed, and reset for reuse.
    pub fn flush(&mut self) -> String {
        let emit = self.buffer.trim_end().to_string();
        self.buffer.clear();
        self.refs.clear();
        emit
    }

    fn rewrite_markers(&mut self) {
        loop {
            let Some((start, digit)) = find_citation_marker(&self.buffer) else { break };

            let k = match self.refs.iter().position(|&d| d == digit) {
                Some(idx) => idx + 1,
                None => {
                    self.refs.push(digit);
                    self.refs.len()
                }
            };

            let end = start + marker_len(digit);
            self.buffer.replace_range(start..end, &format!("[{k}]"));
        }
    }
}

impl Default for CitationRewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first `[citation:d]` marker (single digit `d`), returning its
/// start byte offset and the digit.
fn find_citation_marker(text: &str) -> Option<(usize, char)> {
    const PREFIX: &str = "[citation:";
    let start = text.find(PREFIX)?;
    let rest = &text[start + PREFIX.len()..];
    let digit = rest.chars().next()?;
    if !digit.is_ascii_digit() {
        return None;
    }
    if rest[digit.len_utf8()..].starts_with(']') {
        Some((start, digit))
    } else {
        None
    }
}

fn marker_len(digit: char) -> usize {
    "[citation:".len() + digit.len_utf8() + "]".len()
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all_at_once(input: &str) -> String {
        let mut rewriter = CitationRewriter::new();
        let mut out = rewriter.push(input);
        out.push_str(&rewriter.flush());
        out
    }

    fn run_byte_by_byte(input: &str) -> String {
        let mut rewriter = CitationRewriter::new();
        let mut out = String::new();
        for byte in input.as_bytes() {
            out.push_str(&rewriter.push(&(*byte as char).to_string()));
        }
        out.push_str(&rewriter.flush());
        out
    }

    #[test]
    fn dense_renumbering_reuses_indices_for_repeated_citations() {
        let input = "foo[citation:3] bar[citation:1] baz[citation:3]";
        assert_eq!(run_all_at_once(input), "foo[1] bar[2] baz[1]");
    }

    #[test]
    fn idempotent_under_arbitrary_chunking() {
        let input = "The answer is clear[citation:1] and also backed up[citation:2] by a repeat[citation:1].";
        let whole = run_all_at_once(input);

        for split_at in 0..input.len() {
            if !input.is_char_boundary(split_at) {
                continue;
            }
            let mut rewriter = CitationRewriter::new();
            let mut out = rewriter.push(&input[..split_at]);
            out.push_str(&rewriter.push(&input[split_at..]));
            out.push_str(&rewriter.flush());
            assert_eq!(out, whole, "split at byte {split_at} diverged");
        }
    }

    #[test]
    fn byte_by_byte_chunking_reassembles_split_markers() {
        let input = "x[citation:7]y";
        assert_eq!(run_byte_by_byte(input), "x[1]y");
    }

    #[test]
    fn flush_right_trims_trailing_whitespace() {
        let mut rewriter = CitationRewriter::new();
        rewriter.push("hello   ");
        assert_eq!(rewriter.flush(), "hello");
    }

    #[test]
    fn two_digit_citation_numbers_are_left_as_literal_text() {
        let input = "see[citation:12] for more";
        assert_eq!(run_all_at_once(input), input);
    }
}
