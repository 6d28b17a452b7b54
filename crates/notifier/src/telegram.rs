//! Telegram Bot API client.

use anyhow::Result;
use async_trait::async_trait;
use common::traits::NotificationChannel;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram bot token is empty")]
    BotEmpty,

    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("telegram rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct SendReply {
    #[serde(default)]
    ok: bool,
}

/// Sends HTML messages through `{api_url}/bot{token}/sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    api_url: String,
}

impl TelegramChannel {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_message(&self, bot: &str, text: &str, chat: i64) -> Result<(), TelegramError> {
        if bot.is_empty() {
            return Err(TelegramError::BotEmpty);
        }

        let url = format!("{}/bot{}/sendMessage", self.api_url, bot);
        let chat = chat.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("chat_id", chat.as_str()),
                ("text", text),
                ("parse_mode", "html"),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let accepted = status.is_success()
            && serde_json::from_str::<SendReply>(&body)
                .map(|reply| reply.ok)
                .unwrap_or(false);

        if accepted {
            Ok(())
        } else {
            Err(TelegramError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl Default for TelegramChannel {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, bot_token: &str, text: &str, chat: i64) -> Result<()> {
        self.send_message(bot_token, text, chat).await?;
        Ok(())
    }
}
