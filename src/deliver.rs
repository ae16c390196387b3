use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Markup mode for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    MarkdownV2,
    Plain,
}

/// The send primitive of the destination channel. The orchestrator only
/// sees this trait; the fallback policy (formatted first, plain second)
/// lives with the caller.
#[async_trait]
pub trait DeliverMessage: Send + Sync {
    async fn deliver(&self, text: &str, mode: ParseMode) -> Result<()>;
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API sender for one broadcast channel, optionally addressed
/// to a message thread.
pub struct TelegramSender {
    client: reqwest::Client,
    token: String,
    chat_id: i64,
    thread_id: Option<i64>,
}

impl TelegramSender {
    pub fn new(token: String, chat_id: i64, thread_id: Option<i64>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            chat_id,
            thread_id,
        }
    }
}

#[async_trait]
impl DeliverMessage for TelegramSender {
    async fn deliver(&self, text: &str, mode: ParseMode) -> Result<()> {
        let payload = SendMessageRequest {
            chat_id: self.chat_id,
            text,
            message_thread_id: self.thread_id,
            parse_mode: match mode {
                ParseMode::MarkdownV2 => Some("MarkdownV2"),
                ParseMode::Plain => None,
            },
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!(
                "https://api.telegram.org/bot{}/sendMessage",
                self.token
            ))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::Delivery(e.to_string()))?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Delivery(format!("HTTP {}: {}", status, e)))?;

        if !body.ok {
            return Err(PipelineError::Delivery(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        debug!("delivered {} chars to chat {}", text.len(), self.chat_id);
        Ok(())
    }
}
