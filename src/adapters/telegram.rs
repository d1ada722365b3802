//! Telegram Bot API adapter.
//!
//! One client covers both directions: long-polling `getUpdates` for posts
//! from the monitored source channels, and `sendMessage`/`deleteMessage`
//! against the target channel for publication and retirement.
//!
//! The client keeps a bounded in-memory journal of its own sends so the
//! expiry sweep can enumerate recent payloads; the bot is the only writer
//! to the target channel. A journal lost to a restart only means a sweep
//! finds no payload to delete, which the sweep already tolerates.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{MessageHandle, PublishedMessage, Transport};

/// How many of our own sends to remember for `recent` lookups.
const JOURNAL_CAP: usize = 200;

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// Target channel chat ID
    chat_id: String,
    /// HTTP client
    client: reqwest::Client,
    /// Journal of messages this client published, newest first
    journal: Mutex<VecDeque<PublishedMessage>>,
}

/// Response from Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Message result from sendMessage
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    channel_post: Option<IncomingMessage>,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    text: Option<String>,
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

/// A text post received from a monitored channel.
#[derive(Debug, Clone)]
pub struct ChannelPost {
    /// Channel username if public, otherwise the numeric chat id.
    pub source: String,
    pub text: String,
}

impl TelegramClient {
    /// Create a new Telegram client
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: reqwest::Client::new(),
            journal: Mutex::new(VecDeque::new()),
        }
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Send a text message to the target channel, preview suppressed
    pub async fn send_message(&self, text: &str) -> Result<i64> {
        let url = self.api_url("sendMessage");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .context("Failed to send Telegram message")?;

        let result: TelegramResponse<MessageResult> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !result.ok {
            anyhow::bail!(
                "Telegram API error: {}",
                result.description.unwrap_or_default()
            );
        }

        Ok(result.result.map(|r| r.message_id).unwrap_or(0))
    }

    /// Delete a message from the target channel
    pub async fn delete_message(&self, message_id: i64) -> Result<()> {
        let url = self.api_url("deleteMessage");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "message_id": message_id,
            }))
            .send()
            .await
            .context("Failed to delete Telegram message")?;

        let result: TelegramResponse<bool> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !result.ok {
            anyhow::bail!(
                "Telegram API error: {}",
                result.description.unwrap_or_default()
            );
        }

        Ok(())
    }

    /// Long-poll for new posts across all chats the bot can see.
    ///
    /// `offset` is advanced past every update that was returned, including
    /// ones without text, so the same update is never delivered twice.
    pub async fn poll_posts(&self, offset: &mut i64, timeout_secs: u64) -> Result<Vec<ChannelPost>> {
        let url = self.api_url("getUpdates");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "offset": *offset,
                "timeout": timeout_secs,
                "allowed_updates": ["channel_post", "message"],
            }))
            .send()
            .await
            .context("Failed to poll Telegram updates")?;

        let result: TelegramResponse<Vec<Update>> = response
            .json()
            .await
            .context("Failed to parse Telegram updates")?;

        if !result.ok {
            anyhow::bail!(
                "Telegram API error: {}",
                result.description.unwrap_or_default()
            );
        }

        let mut posts = Vec::new();
        for update in result.result.unwrap_or_default() {
            *offset = (*offset).max(update.update_id + 1);

            let Some(message) = update.channel_post.or(update.message) else {
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };

            let source = message
                .chat
                .username
                .unwrap_or_else(|| message.chat.id.to_string());

            posts.push(ChannelPost { source, text });
        }

        Ok(posts)
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn publish(&self, text: &str) -> Result<MessageHandle> {
        let message_id = self.send_message(text).await?;
        let handle = MessageHandle(message_id);

        let mut journal = self.journal.lock().await;
        journal.push_front(PublishedMessage {
            handle: handle.clone(),
            text: text.to_string(),
        });
        journal.truncate(JOURNAL_CAP);

        Ok(handle)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PublishedMessage>> {
        let journal = self.journal.lock().await;
        Ok(journal.iter().take(limit).cloned().collect())
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<()> {
        self.delete_message(handle.0).await?;

        let mut journal = self.journal.lock().await;
        journal.retain(|m| m.handle != *handle);

        Ok(())
    }
}
