//! Reason stage (C4).
//!
//! Primes the chat model to complete directly into the labelled-field
//! grammar (C1): a partial assistant turn `"TOOL: Google.\nLANGUAGE: "` forces
//! the continuation to start exactly where the fields begin. Retries once,
//! re-priming straight onto `KEYPHRASES:`, if the first attempt produced no
//! keyphrases.

use crate::chat::ChatClient;
use crate::codec::Fields;
use crate::config::Config;
use crate::context::{Context, Message};
use crate::error::Result;
use crate::logger;

const ASSISTANT_NAME: &str = "Gamal";

const FEW_SHOT_EXAMPLE: &str = "INQUIRY: Pourquoi le lac de Pitch est-il c\u{e9}l\u{e8}bre ?
TOOL: Google.
LANGUAGE: French
THOUGHT: C'est une question sur un site g\u{e9}ologique c\u{e9}l\u{e8}bre \u{e0} Trinit\u{e9}.
KEYPHRASES: lac de Pitch Trinit\u{e9} c\u{e9}l\u{e8}bre
OBSERVATION: Le lac de Pitch est le plus grand gisement naturel d'asphalte au monde.
TOPIC: g\u{e9}ographie";

pub struct ReasonStage {
    debug: bool,
}

impl ReasonStage {
    pub fn new(config: &Config) -> Self {
        Self { debug: config.debug_pipeline }
    }

    pub async fn run(&self, chat: &ChatClient, mut ctx: Context) -> Result<Context> {
        ctx.enter_stage("Reason");

        let mut messages = vec![Message::system(system_prompt(ctx.history.is_empty()))];
        let start = ctx.history.len().saturating_sub(3);
        for entry in &ctx.history[start..] {
            messages.push(Message::user(entry.inquiry.clone()));
            messages.push(Message::assistant(history_turn(entry)));
        }
        messages.push(Message::user(ctx.inquiry.clone()));

        let hint = "TOOL: Google.\nLANGUAGE: ".to_string();
        messages.push(Message::assistant(hint.clone()));
        logger::debug(self.debug, || format!("reason messages (attempt 1): {messages:?}"));

        let completion = chat.complete(&messages, None).await?;
        let mut fields = Fields::parse(&format!("{hint}{completion}"));
        logger::debug(self.debug, || format!("reason fields (attempt 1): {fields:?}"));

        if fields.keyphrases.as_deref().unwrap_or("").is_empty() {
            let thought = fields.thought.clone().unwrap_or_default();
            let retry_hint = format!("TOOL: Google.\nTHOUGHT: {thought}\nKEYPHRASES: ");
            messages.pop();
            messages.push(Message::assistant(retry_hint.clone()));
            logger::debug(self.debug, || format!("reason messages (retry): {messages:?}"));

            let completion = chat.complete(&messages, None).await?;
            fields = Fields::parse(&format!("{retry_hint}{completion}"));
            logger::debug(self.debug, || format!("reason fields (retry): {fields:?}"));
        }

        ctx.language = fields.language.clone();
        ctx.topic = fields.topic.clone();
        ctx.thought = fields.thought.clone();
        ctx.keyphrases = fields.keyphrases.clone();
        ctx.observation = fields.observation.clone();

        ctx.leave_stage(
            "Reason",
            serde_json::json!({
                "language": ctx.language,
                "topic": ctx.topic,
                "thought": ctx.thought,
                "keyphrases": ctx.keyphrases,
                "observation": ctx.observation,
            }),
        );

        Ok(ctx)
    }
}

fn system_prompt(history_empty: bool) -> String {
    let mut prompt = format!(
        "You are {ASSISTANT_NAME}, a research assistant that answers questions by searching the web.\n\n\
For every inquiry, respond with exactly these labelled fields, one per line, in this order:\n\
TOOL: the tool you will use (always \"Google.\")\n\
LANGUAGE: the language of the inquiry\n\
THOUGHT: a brief reasoning about what is being asked\n\
KEYPHRASES: a short web search query that will find the answer\n\
OBSERVATION: once search results are available, a brief note on what they show\n\
TOPIC: a short topic label for this inquiry"
    );

    if history_empty {
        prompt.push_str("\n\n");
        prompt.push_str(FEW_SHOT_EXAMPLE);
    }

    prompt
}

/// Replay a history entry as the assistant turn it produced, so the model is
/// trained on its own earlier completions within this conversation.
fn history_turn(entry: &crate::context::HistoryEntry) -> String {
    Fields {
        tool: Some("Google.".to_string()),
        thought: Some(entry.thought.clone()),
        keyphrases: Some(entry.keyphrases.clone()),
        observation: Some(entry.answer.clone()),
        topic: Some(entry.topic.clone()),
        ..Default::default()
    }
    .construct()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_includes_few_shot_only_when_history_empty() {
        assert!(system_prompt(true).contains("Pitch"));
        assert!(!system_prompt(false).contains("Pitch"));
    }

    #[test]
    fn history_turn_carries_answer_forward_as_observation() {
        let entry = crate::context::HistoryEntry {
            inquiry: "q".into(),
            thought: "t".into(),
            keyphrases: "k".into(),
            topic: "geo".into(),
            answer: "the final answer".into(),
            ..Default::default()
        };
        let turn = history_turn(&entry);
        assert!(turn.contains("OBSERVATION: the final answer"));
        assert!(turn.contains("TOPIC: geo"));
    }
}
