//! Labelled-field codec (C1).
//!
//! Serializes and parses the `MARKER: value` multi-line record exchanged
//! with the LLM during the Reason stage. Six markers are recognized, always
//! in this order: `INQUIRY, TOOL, LANGUAGE, THOUGHT, KEYPHRASES, OBSERVATION,
//! TOPIC`.
//!
//! Parsing anchors on the *last* occurrence of `TOPIC:` and walks backwards
//! through the remaining markers, because the LLM is primed with a partial
//! hint and completes from there — echoes of earlier few-shot examples must
//! not shadow the actual completion.

const MARKERS: [&str; 7] =
    ["INQUIRY", "TOOL", "LANGUAGE", "THOUGHT", "KEYPHRASES", "OBSERVATION", "TOPIC"];

/// A parsed or to-be-serialized set of labelled fields.
///
/// All fields are optional: `Fields::parse` leaves a marker `None` if it
/// wasn't found, and `Fields::construct` omits `None` fields from the
/// serialized output entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub inquiry: Option<String>,
    pub tool: Option<String>,
    pub language: Option<String>,
    pub thought: Option<String>,
    pub keyphrases: Option<String>,
    pub observation: Option<String>,
    pub topic: Option<String>,
}

impl Fields {
    fn get(&self, marker: &str) -> Option<&str> {
        match marker {
            "INQUIRY" => self.inquiry.as_deref(),
            "TOOL" => self.tool.as_deref(),
            "LANGUAGE" => self.language.as_deref(),
            "THOUGHT" => self.thought.as_deref(),
            "KEYPHRASES" => self.keyphrases.as_deref(),
            "OBSERVATION" => self.observation.as_deref(),
            "TOPIC" => self.topic.as_deref(),
            _ => None,
        }
    }

    fn set(&mut self, marker: &str, value: String) {
        match marker {
            "INQUIRY" => self.inquiry = Some(value),
            "TOOL" => self.tool = Some(value),
            "LANGUAGE" => self.language = Some(value),
            "THOUGHT" => self.thought = Some(value),
            "KEYPHRASES" => self.keyphrases = Some(value),
            "OBSERVATION" => self.observation = Some(value),
            "TOPIC" => self.topic = Some(value),
            _ => {}
        }
    }

    /// Serialize non-empty fields, in marker order, one `MARKER: value` line
    /// each, joined with newlines. Absent or empty markers are omitted.
    pub fn construct(&self) -> String {
        MARKERS
            .iter()
            .filter_map(|marker| {
                let value = self.get(marker)?;
                if value.is_empty() {
                    None
                } else {
                    Some(format!("{marker}: {value}"))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse free text possibly containing chatter before/after/between the
    /// labelled fields.
    ///
    /// Returns an empty `Fields` (all `None`) if no `TOPIC:` anchor is found;
    /// callers should re-attempt after appending a synthetic
    /// `TOPIC: general knowledge.` line.
    pub fn parse(text: &str) -> Self {
        let mut fields = Fields::default();

        let topic_marker = "TOPIC:";
        let Some(topic_idx) = text.rfind(topic_marker) else {
            return fields;
        };

        let topic_value_start = topic_idx + topic_marker.len();
        fields.topic = Some(text[topic_value_start..].trim().to_string());

        let mut prefix = &text[..topic_idx];

        // Walk remaining markers from last to first (OBSERVATION .. INQUIRY).
        for marker in MARKERS[..MARKERS.len() - 1].iter().rev() {
            let needle = format!("{marker}:");
            let Some(idx) = prefix.rfind(&needle) else {
                continue;
            };

            let value_start = idx + needle.len();
            let rest = &prefix[value_start..];
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let value = rest[..line_end].trim().to_string();
            fields.set(marker, value);

            prefix = &prefix[..idx];
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_all_six_non_empty_keys() {
        let fields = Fields {
            inquiry: Some("Who built the pyramids?".into()),
            tool: Some("Google.".into()),
            language: Some("English".into()),
            thought: Some("Ancient history question.".into()),
            keyphrases: Some("pyramids builders".into()),
            observation: Some("The pyramids were built by skilled laborers.".into()),
            topic: Some("history".into()),
        };

        let parsed = Fields::parse(&fields.construct());
        assert_eq!(parsed, fields);
    }

    #[test]
    fn construct_omits_absent_markers() {
        let fields = Fields { language: Some("English".into()), topic: Some("general".into()), ..Default::default() };
        let text = fields.construct();
        assert_eq!(text, "LANGUAGE: English\nTOPIC: general");
    }

    #[test]
    fn parse_uses_last_occurrence_of_topic() {
        let parsed = Fields::parse("TOPIC: a\nTOPIC: b");
        assert_eq!(parsed.topic.as_deref(), Some("b"));
    }

    #[test]
    fn parse_returns_empty_when_topic_anchor_missing() {
        let parsed = Fields::parse("TOOL: Google.\nLANGUAGE: English\n");
        assert_eq!(parsed, Fields::default());
    }

    #[test]
    fn parse_value_is_first_line_after_marker() {
        let parsed = Fields::parse("THOUGHT: multi\nword thought\nKEYPHRASES: x\nTOPIC: y");
        assert_eq!(parsed.thought.as_deref(), Some("multi"));
    }

    #[test]
    fn parse_tolerates_chatter_and_priming_hint() {
        let text = "Sure, here goes.\nTOOL: Google.\nLANGUAGE: French\nTHOUGHT: c'est une question sur le lac.\nKEYPHRASES: lac Pitch\nOBSERVATION: aucune\nTOPIC: géographie";
        let parsed = Fields::parse(text);
        assert_eq!(parsed.tool.as_deref(), Some("Google."));
        assert_eq!(parsed.language.as_deref(), Some("French"));
        assert_eq!(parsed.keyphrases.as_deref(), Some("lac Pitch"));
        assert_eq!(parsed.topic.as_deref(), Some("géographie"));
    }

    #[test]
    fn parse_ignores_marker_shadowed_by_later_one() {
        // Earlier few-shot echo of KEYPHRASES must not shadow the real completion.
        let text = "KEYPHRASES: stale echo\nTHOUGHT: real thought\nKEYPHRASES: fresh keyphrases\nTOPIC: t";
        let parsed = Fields::parse(text);
        assert_eq!(parsed.keyphrases.as_deref(), Some("fresh keyphrases"));
    }
}
