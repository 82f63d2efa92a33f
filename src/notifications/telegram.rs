//! Telegram Bot API transport
//!
//! Each event becomes one `sendMessage` call in HTML parse mode. The Bot API
//! can answer with `"ok": false`, so the reply body is checked as well as
//! the HTTP status.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AlertLevel, NotificationEvent, NotificationService};
use crate::config::TelegramNotificationConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// `sendMessage` request body
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    /// Startup and discovery summaries arrive without a sound
    disable_notification: bool,
}

/// Envelope of every Bot API reply
#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl BotReply {
    fn into_result(self) -> anyhow::Result<()> {
        if self.ok {
            return Ok(());
        }
        anyhow::bail!(
            "Telegram rejected message ({}): {}",
            self.error_code.unwrap_or_default(),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

/// Telegram notification service
pub struct TelegramNotifier {
    client: reqwest::Client,
    /// Full `sendMessage` URL; embeds the bot token
    endpoint: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramNotificationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            enabled: config.enabled && !config.bot_token.is_empty() && !config.chat_id.is_empty(),
        })
    }

    fn payload(&self, event: &NotificationEvent) -> SendMessage<'_> {
        SendMessage {
            chat_id: &self.chat_id,
            text: event.format_message(),
            parse_mode: "HTML",
            disable_web_page_preview: true,
            disable_notification: event.level() == AlertLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl NotificationService for TelegramNotifier {
    async fn notify(&self, event: NotificationEvent) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        // reqwest errors carry the URL, which holds the bot token
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(&event))
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let status = response.status();
        let reply: BotReply = response.json().await.map_err(|e| {
            anyhow::anyhow!(
                "Telegram answered {} with an unreadable body: {}",
                status,
                e.without_url()
            )
        })?;
        reply.into_result()?;

        tracing::debug!(level = %event.level(), "Telegram message delivered");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
