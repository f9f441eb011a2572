//! Respond stage (C5).
//!
//! Templates the numbered references into the system prompt and streams the
//! model's cited answer through the context's `stream` delegate as it
//! arrives.

use crate::chat::ChatClient;
use crate::config::Config;
use crate::context::{Context, Message};
use crate::error::Result;
use crate::logger;

const RESPOND_PROMPT: &str = "You are a research assistant. Answer the inquiry in {LANGUAGE}, in no more than three sentences unless explicitly asked for more detail. Cite every sentence that relies on a reference using the form [citation:x], where x is the reference's number below. Prefer the most relevant references; it is fine to not cite all of them.

References:
{REFERENCES}";

pub struct RespondStage {
    debug: bool,
}

impl RespondStage {
    pub fn new(config: &Config) -> Self {
        Self { debug: config.debug_pipeline }
    }

    pub async fn run(&self, chat: &ChatClient, mut ctx: Context) -> Result<Context> {
        ctx.enter_stage("Respond");

        if ctx.references.is_empty() {
            logger::debug(self.debug, || "respond: no references, skipping LLM call".to_string());
            ctx.answer = String::new();
            ctx.leave_stage("Respond", serde_json::json!({"answer_len": 0, "degraded": true}));
            return Ok(ctx);
        }

        let language = ctx.language.clone().unwrap_or_else(|| "English".to_string());
        let references = ctx
            .references
            .iter()
            .map(|r| format!("[citation:{}] {} - {}", r.position, r.title, r.snippet))
            .collect::<Vec<_>>()
            .join("\n");

        let system = RESPOND_PROMPT.replace("{LANGUAGE}", &language).replace("{REFERENCES}", &references);
        let messages = vec![Message::system(system), Message::user(ctx.inquiry.clone())];
        logger::debug(self.debug, || format!("respond messages: {messages:?}"));

        let sink = |delta: &str| ctx_emit(&ctx, delta);
        let answer = chat.complete(&messages, Some(&sink)).await?;
        ctx.answer = answer;

        ctx.leave_stage("Respond", serde_json::json!({"answer_len": ctx.answer.len(), "degraded": false}));
        Ok(ctx)
    }
}

fn ctx_emit(ctx: &Context, delta: &str) {
    ctx.emit(delta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_templating_substitutes_language_and_references() {
        let rendered = RESPOND_PROMPT.replace("{LANGUAGE}", "French").replace("{REFERENCES}", "[citation:1] a - b");
        assert!(rendered.contains("French"));
        assert!(rendered.contains("[citation:1] a - b"));
        assert!(!rendered.contains("{LANGUAGE}"));
        assert!(!rendered.contains("{REFERENCES}"));
    }
}
