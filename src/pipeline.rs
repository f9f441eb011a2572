//! Pipeline driver (C6).
//!
//! Sequential composition of the three stages. The driver holds no state of
//! its own; it threads one context value through `reason → search → respond`
//! and returns whatever the last stage produced, or the first error.

use std::sync::Arc;

use crate::chat::ChatClient;
use crate::config::Config;
use crate::context::{Context, Delegates, HistoryEntry};
use crate::error::Result;
use crate::reason::ReasonStage;
use crate::respond::RespondStage;
use crate::search::SearchClient;

pub struct Pipeline {
    chat: ChatClient,
    search: SearchClient,
    reason: ReasonStage,
    respond: RespondStage,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            chat: ChatClient::new(config),
            search: SearchClient::new(config),
            reason: ReasonStage::new(config),
            respond: RespondStage::new(config),
        }
    }

    /// Run one inquiry to completion and return the [`HistoryEntry`] to
    /// append. Any stage failure aborts the run without producing an entry.
    pub async fn run(
        &self,
        inquiry: impl Into<String>,
        history: Vec<HistoryEntry>,
        delegates: Arc<Delegates>,
    ) -> Result<HistoryEntry> {
        let ctx = Context::new(inquiry, history, delegates);

        let ctx = self.reason.run(&self.chat, ctx).await?;
        let ctx = self.search_stage(ctx).await?;
        let ctx = self.respond.run(&self.chat, ctx).await?;

        Ok(ctx.into_history_entry())
    }

    async fn search_stage(&self, mut ctx: Context) -> Result<Context> {
        ctx.enter_stage("Search");

        let keyphrases = ctx.keyphrases.clone().unwrap_or_default();
        let references = if keyphrases.is_empty() { Vec::new() } else { self.search.search(&keyphrases).await? };

        ctx.references = references;
        ctx.leave_stage("Search", serde_json::json!({"hits": ctx.references.len()}));
        Ok(ctx)
    }
}
