//! Environment-driven configuration (A1).
//!
//! Read once at process start. Front-ends call [`Config::from_env`] before
//! constructing anything else so a missing `YOU_API_KEY` fails fast, before
//! any socket is opened.

use crate::error::{GamalError, Result};

const DEFAULT_LLM_API_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_LLM_CHAT_MODEL: &str = "meta-llama/llama-3-8b-instruct";
const MIN_YOU_API_KEY_LEN: usize = 64;
const MIN_TELEGRAM_TOKEN_LEN: usize = 40;

#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_chat_model: String,
    pub llm_streaming_enabled: bool,
    pub you_api_key: String,
    pub http_port: Option<u16>,
    pub telegram_token: Option<String>,
    pub debug_chat: bool,
    pub debug_pipeline: bool,
    pub debug_search: bool,
    pub debug_fail_exit: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Returns `Err(GamalError::Config)` if `YOU_API_KEY` is missing or too
    /// short, `GAMAL_HTTP_PORT` is set but not a valid port, or
    /// `GAMAL_TELEGRAM_TOKEN` is set but too short.
    pub fn from_env() -> Result<Self> {
        let you_api_key = std::env::var("YOU_API_KEY")
            .map_err(|_| GamalError::Config("YOU_API_KEY is required".into()))?;
        if you_api_key.len() < MIN_YOU_API_KEY_LEN {
            return Err(GamalError::Config(format!(
                "YOU_API_KEY must be at least {MIN_YOU_API_KEY_LEN} characters"
            )));
        }

        let http_port = match std::env::var("GAMAL_HTTP_PORT") {
            Ok(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|_| GamalError::Config(format!("invalid GAMAL_HTTP_PORT: {raw}")))?,
            ),
            Err(_) => None,
        };

        let telegram_token = match std::env::var("GAMAL_TELEGRAM_TOKEN") {
            Ok(token) if token.len() >= MIN_TELEGRAM_TOKEN_LEN => Some(token),
            Ok(token) => {
                return Err(GamalError::Config(format!(
                    "GAMAL_TELEGRAM_TOKEN must be at least {MIN_TELEGRAM_TOKEN_LEN} characters, got {}",
                    token.len()
                )))
            }
            Err(_) => None,
        };

        Ok(Self {
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_API_BASE_URL.to_string()),
            llm_api_key: std::env::var("LLM_API_KEY").ok(),
            llm_chat_model: std::env::var("LLM_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_LLM_CHAT_MODEL.to_string()),
            llm_streaming_enabled: std::env::var("LLM_STREAMING").as_deref() != Ok("no"),
            you_api_key,
            http_port,
            telegram_token,
            debug_chat: is_set("LLM_DEBUG_CHAT"),
            debug_pipeline: is_set("LLM_DEBUG_PIPELINE"),
            debug_search: is_set("LLM_DEBUG_SEARCH"),
            debug_fail_exit: is_set("LLM_DEBUG_FAIL_EXIT"),
        })
    }
}

fn is_set(name: &str) -> bool {
    std::env::var(name).map(|v| v != "no" && !v.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "YOU_API_KEY",
            "GAMAL_HTTP_PORT",
            "GAMAL_TELEGRAM_TOKEN",
            "LLM_API_BASE_URL",
            "LLM_API_KEY",
            "LLM_CHAT_MODEL",
            "LLM_STREAMING",
            "LLM_DEBUG_CHAT",
            "LLM_DEBUG_PIPELINE",
            "LLM_DEBUG_SEARCH",
            "LLM_DEBUG_FAIL_EXIT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn missing_you_api_key_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        assert!(matches!(Config::from_env(), Err(GamalError::Config(_))));
    }

    #[test]
    fn short_you_api_key_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("YOU_API_KEY", "too-short");
        assert!(matches!(Config::from_env(), Err(GamalError::Config(_))));
        clear_env();
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("YOU_API_KEY", "x".repeat(MIN_YOU_API_KEY_LEN));
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.llm_api_base_url, DEFAULT_LLM_API_BASE_URL);
        assert_eq!(cfg.llm_chat_model, DEFAULT_LLM_CHAT_MODEL);
        assert!(cfg.llm_streaming_enabled);
        assert!(cfg.http_port.is_none());
        assert!(cfg.telegram_token.is_none());
        clear_env();
    }

    #[test]
    fn llm_streaming_no_disables_streaming() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("YOU_API_KEY", "x".repeat(MIN_YOU_API_KEY_LEN));
        std::env::set_var("LLM_STREAMING", "no");
        let cfg = Config::from_env().unwrap();
        assert!(!cfg.llm_streaming_enabled);
        clear_env();
    }

    #[test]
    fn short_telegram_token_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("YOU_API_KEY", "x".repeat(MIN_YOU_API_KEY_LEN));
        std::env::set_var("GAMAL_TELEGRAM_TOKEN", "short");
        assert!(matches!(Config::from_env(), Err(GamalError::Config(_))));
        clear_env();
    }
}
