//! Telegram long-poller front-end.
//!
//! Raw `reqwest` against the Bot API, grounded on the same shape as a typical
//! hand-rolled Telegram client: no bot framework, just `getUpdates` /
//! `sendMessage`. `/reset` and `/review` are intercepted before the pipeline
//! ever sees the message; everything else is handed to the pipeline for a
//! full run, keyed by chat id.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Delegates;
use crate::error::{GamalError, Result};
use crate::history::ChatHistories;
use crate::logger;
use crate::pipeline::Pipeline;

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramFrontend {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: i64,
    text: String,
}

impl TelegramFrontend {
    pub fn new(token: &str) -> Self {
        Self { client: reqwest::Client::new(), api_base: format!("https://api.telegram.org/bot{token}") }
    }

    pub async fn run(&self, pipeline: Pipeline) -> Result<()> {
        let mut histories = ChatHistories::new();
        let mut offset: i64 = 0;

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(err) => {
                    logger::log(format!("telegram: getUpdates failed: {err}"));
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                let chat_id = message.chat.id;

                self.handle_message(&pipeline, &mut histories, chat_id, &text).await;
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn handle_message(&self, pipeline: &Pipeline, histories: &mut ChatHistories, chat_id: i64, text: &str) {
        let history = histories.get_mut(chat_id);

        match text.trim() {
            "/reset" => {
                history.reset();
                self.reply(chat_id, "History cleared.").await;
                return;
            }
            "/review" => {
                let review = history.review();
                self.reply(chat_id, &review).await;
                return;
            }
            _ => {}
        }

        let delegates = Arc::new(Delegates::new());
        match pipeline.run(text, history.entries().to_vec(), delegates).await {
            Ok(entry) => {
                let answer = entry.answer.clone();
                history.push(entry);
                self.reply(chat_id, &answer).await;
            }
            Err(err) => {
                logger::log(format!("telegram: pipeline failed for chat {chat_id}: {err}"));
                self.reply(chat_id, "Sorry, something went wrong.").await;
            }
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TgUpdate>> {
        let url = format!(
            "{}/getUpdates?offset={offset}&timeout={LONG_POLL_TIMEOUT_SECS}",
            self.api_base
        );

        let response: TgResponse<Vec<TgUpdate>> = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 10))
            .send()
            .await
            .map_err(|e| GamalError::Llm(format!("telegram getUpdates request failed: {e}")))?
            .json()
            .await
            .map_err(|e| GamalError::Llm(format!("telegram getUpdates decode failed: {e}")))?;

        if !response.ok {
            return Err(GamalError::Llm(format!("telegram getUpdates error: {}", response.description)));
        }

        Ok(response.result.unwrap_or_default())
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        let body = SendMessageRequest { chat_id, text: text.to_string() };
        if let Err(err) = self.client.post(format!("{}/sendMessage", self.api_base)).json(&body).send().await {
            log::error!("telegram: sendMessage failed for chat {chat_id}: {err}");
        }
    }
}
