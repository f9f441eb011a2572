//! Answer matcher (C9).
//!
//! Used by the file-based test runner. Compiles an expected string written in
//! a compact `/regex/regex/` fence syntax into a conjunction of
//! case-insensitive regexes, checks a target string against all of them, and
//! highlights the matched spans for display.

use regex::Regex;

const ANSI_HIGHLIGHT_START: &str = "\x1b[1;32m";
const ANSI_HIGHLIGHT_END: &str = "\x1b[0m";

pub struct Matcher {
    patterns: Vec<Regex>,
}

impl Matcher {
    /// Compile `expected` into a conjunction of regexes.
    ///
    /// Scans for `/.../ ` fences, honoring `\/` as an escaped literal slash
    /// inside a fence. If no fence is found, the whole string is compiled as
    /// one case-insensitive regex.
    pub fn compile(expected: &str) -> Result<Self, regex::Error> {
        let fences = extract_fences(expected);
        let bodies = if fences.is_empty() { vec![expected.to_string()] } else { fences };

        let patterns = bodies
            .iter()
            .map(|body| Regex::new(&format!("(?i){body}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// A target satisfies the expectation iff every compiled pattern matches
    /// at least once.
    pub fn is_satisfied_by(&self, target: &str) -> bool {
        self.patterns.iter().all(|re| re.is_match(target))
    }

    /// Highlight every matched span in `target` with ANSI codes. Spans are
    /// wrapped in descending order by start index so earlier replacements
    /// don't invalidate the byte offsets of later ones.
    pub fn highlight(&self, target: &str) -> String {
        let mut spans: Vec<(usize, usize)> =
            self.patterns.iter().flat_map(|re| re.find_iter(target).map(|m| (m.start(), m.end()))).collect();
        spans.sort_by(|a, b| b.0.cmp(&a.0));

        let mut out = target.to_string();
        for (start, end) in spans {
            let highlighted = format!("{ANSI_HIGHLIGHT_START}{}{ANSI_HIGHLIGHT_END}", &out[start..end]);
            out.replace_range(start..end, &highlighted);
        }
        out
    }
}

/// Extract `/.../ ` fenced bodies from `text`, honoring `\/` as a literal
/// slash that does not end the fence.
fn extract_fences(text: &str) -> Vec<String> {
    let mut fences = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '/' {
            let mut body = String::new();
            let mut j = i + 1;
            let mut closed = false;

            while j < chars.len() {
                if chars[j] == '\\' && j + 1 < chars.len() && chars[j + 1] == '/' {
                    body.push('/');
                    j += 2;
                    continue;
                }
                if chars[j] == '/' {
                    closed = true;
                    break;
                }
                body.push(chars[j]);
                j += 1;
            }

            if closed {
                fences.push(body);
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }

    fences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fences_compiles_whole_string_as_one_regex() {
        let matcher = Matcher::compile("Paris").unwrap();
        assert_eq!(matcher.patterns.len(), 1);
        assert!(matcher.is_satisfied_by("the capital is paris"));
    }

    #[test]
    fn multiple_fences_compile_to_a_conjunction() {
        let matcher = Matcher::compile("capital /Paris/ and /France/").unwrap();
        assert_eq!(matcher.patterns.len(), 2);
        assert!(matcher.is_satisfied_by("Paris is the capital of France"));
        assert!(!matcher.is_satisfied_by("Paris is lovely"));
    }

    #[test]
    fn escaped_slash_is_honored_inside_a_fence() {
        let matcher = Matcher::compile(r"/a\/b/").unwrap();
        assert!(matcher.is_satisfied_by("a/b"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let matcher = Matcher::compile("/asphalte/").unwrap();
        assert!(matcher.is_satisfied_by("le lac de pitch contient de l'ASPHALTE."));
    }

    #[test]
    fn highlight_wraps_every_matched_span() {
        let matcher = Matcher::compile("/Pluto/").unwrap();
        let highlighted = matcher.highlight("Pluto is a dwarf planet");
        assert!(highlighted.contains(ANSI_HIGHLIGHT_START));
        assert!(highlighted.contains("Pluto"));
        assert!(highlighted.contains(ANSI_HIGHLIGHT_END));
    }
}
