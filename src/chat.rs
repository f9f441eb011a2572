//! Streaming chat client (C2).
//!
//! Talks to an OpenAI-style `/chat/completions` endpoint. In non-streaming
//! mode it decodes one JSON reply; in streaming mode it decodes an
//! incremental, SSE-like `data: ` transcript that may arrive split across
//! arbitrary byte boundaries, forwarding clean textual deltas to a sink as
//! they're recognized.

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::context::{Message, Role};
use crate::error::{GamalError, Result};
use crate::logger;

const STOP_SEQUENCES: &[&str] =
    &["<|im_end|>", "<|end|>", "<|eot_id|>", "<|end_of_turn|>", "INQUIRY: "];
const MAX_TOKENS: u32 = 400;

pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    streaming_enabled: bool,
    debug: bool,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.llm_api_base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_chat_model.clone(),
            streaming_enabled: config.llm_streaming_enabled,
            debug: config.debug_chat,
        }
    }

    /// Send `messages` to the chat endpoint and return the full assistant
    /// reply. When `sink` is supplied and streaming is enabled, `sink` is
    /// invoked once per textual delta as the server produces it; otherwise
    /// it is invoked exactly once with the full reply.
    pub async fn complete(&self, messages: &[Message], sink: Option<&dyn Fn(&str)>) -> Result<String> {
        let stream = sink.is_some() && self.streaming_enabled;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            stream,
        };

        logger::debug(self.debug, || {
            format!("chat request: {}", serde_json::to_string(&request).unwrap_or_default())
        });

        let mut req = self.http.post(format!("{}/chat/completions", self.base_url)).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| GamalError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GamalError::Llm(format!("HTTP {status}: {body}")));
        }

        if stream {
            self.complete_streaming(response, sink.expect("checked above")).await
        } else {
            self.complete_once(response, sink).await
        }
    }

    async fn complete_once(&self, response: reqwest::Response, sink: Option<&dyn Fn(&str)>) -> Result<String> {
        let body = response.bytes().await.map_err(|e| GamalError::Llm(e.to_string()))?;
        logger::debug(self.debug, || format!("chat response: {}", String::from_utf8_lossy(&body)));

        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&body).map_err(|e| GamalError::Llm(format!("JSON parse error: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let content = content.trim().to_string();

        if let Some(sink) = sink {
            sink(&content);
        }

        Ok(content)
    }

    async fn complete_streaming(&self, response: reqwest::Response, sink: &dyn Fn(&str)) -> Result<String> {
        let mut byte_stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut answer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| GamalError::Llm(e.to_string()))?;
            logger::debug(self.debug, || format!("chat stream bytes: {}", String::from_utf8_lossy(&chunk)));

            for delta in decoder.push(&chunk) {
                answer.push_str(&delta);
                sink(&delta);
            }

            if decoder.is_done() {
                break;
            }
        }

        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    stop: Vec<String>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        WireMessage { role, content: msg.content.clone() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    message: ChoiceMessageContent,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessageContent {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChoiceDelta>,
}

#[derive(Debug, Deserialize)]
struct ChoiceDelta {
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Stateful transducer that decodes an SSE-like `data: ` transcript into
/// textual deltas, tolerating arbitrary byte chunking of the underlying
/// stream. Call [`SseDecoder::push`] once per network read; each call
/// returns the deltas fully decoded from the accumulated buffer so far.
struct SseDecoder {
    buffer: String,
    first_delta_emitted: bool,
    done: bool,
}

impl SseDecoder {
    fn new() -> Self {
        Self { buffer: String::new(), first_delta_emitted: false, done: false }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut deltas = Vec::new();

        while let Some(idx) = self.buffer.find('\n') {
            let line = self.buffer[..idx].to_string();
            let rest = self.buffer[idx + 1..].to_string();

            if line.starts_with(':') {
                self.buffer = rest;
                continue;
            }

            if line == "data: [DONE]" {
                self.buffer = rest;
                self.done = true;
                break;
            }

            let Some(payload) = line.strip_prefix("data: ") else {
                self.buffer = rest;
                continue;
            };

            match serde_json::from_str::<ChatCompletionChunk>(payload) {
                Ok(chunk) => {
                    self.buffer = rest;
                    if let Some(delta) = chunk.choices.first().and_then(|c| c.delta.content.clone()) {
                        if let Some(delta) = self.normalize(delta) {
                            deltas.push(delta);
                        }
                    }
                }
                Err(_) => {
                    // Truncated/malformed frame: merge with the next line and
                    // retry rather than dropping it.
                    self.buffer = format!("{line}{rest}");
                }
            }
        }

        deltas
    }

    /// Strip leading whitespace from the very first non-empty delta only;
    /// emit subsequent deltas verbatim. Empty deltas (keep-alives,
    /// role-only frames) are skipped without advancing `first_delta_emitted`.
    fn normalize(&mut self, delta: String) -> Option<String> {
        if delta.is_empty() {
            return None;
        }

        if !self.first_delta_emitted {
            let trimmed = delta.trim_start().to_string();
            if trimmed.is_empty() {
                return None;
            }
            self.first_delta_emitted = true;
            Some(trimmed)
        } else {
            Some(delta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done_frame() -> &'static str {
        "data: [DONE]\n"
    }

    #[test]
    fn decodes_whole_transcript_fed_in_one_push() {
        let mut decoder = SseDecoder::new();
        let transcript = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"  Hello\"}}}}]}}\ndata: {{\"choices\":[{{\"delta\":{{\"content\":\", world\"}}}}]}}\n{}",
            done_frame()
        );
        let deltas = decoder.push(transcript.as_bytes());
        assert_eq!(deltas, vec!["Hello".to_string(), ", world".to_string()]);
        assert!(decoder.is_done());
    }

    #[test]
    fn split_at_arbitrary_byte_boundary_yields_identical_answer() {
        let transcript = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"  Hello\"}}}}]}}\ndata: {{\"choices\":[{{\"delta\":{{\"content\":\", world\"}}}}]}}\n{}",
            done_frame()
        );
        let bytes = transcript.as_bytes();

        for split_at in 0..bytes.len() {
            let mut decoder = SseDecoder::new();
            let mut answer = String::new();
            for delta in decoder.push(&bytes[..split_at]) {
                answer.push_str(&delta);
            }
            for delta in decoder.push(&bytes[split_at..]) {
                answer.push_str(&delta);
            }
            assert_eq!(answer, "Hello, world", "split at byte {split_at} produced {answer:?}");
        }
    }

    #[test]
    fn skips_comment_lines() {
        let mut decoder = SseDecoder::new();
        let transcript = ": keep-alive\ndata: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n";
        let deltas = decoder.push(transcript.as_bytes());
        assert_eq!(deltas, vec!["hi".to_string()]);
    }

    #[test]
    fn skips_empty_and_role_only_deltas() {
        let mut decoder = SseDecoder::new();
        let transcript = "data: {\"choices\":[{\"delta\":{}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n";
        let deltas = decoder.push(transcript.as_bytes());
        assert_eq!(deltas, vec!["ok".to_string()]);
    }
}
