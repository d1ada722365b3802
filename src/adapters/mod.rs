//! Adapter interfaces for the chat transport.
//!
//! The lifecycle core talks to the output channel only through the
//! `Transport` trait, so tests can substitute a recording mock and the
//! Telegram client stays swappable.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

// Re-export the Telegram client
pub use telegram::{ChannelPost, TelegramClient};

/// Opaque handle for deleting a previously published payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(pub i64);

/// A previously published payload with its deletion handle.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub handle: MessageHandle,
    pub text: String,
}

/// Trait for the output-channel transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a text payload to the output channel, link preview suppressed.
    async fn publish(&self, text: &str) -> Result<MessageHandle>;

    /// Enumerate recently published payloads, newest first, up to `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<PublishedMessage>>;

    /// Delete a previously published payload.
    async fn delete(&self, handle: &MessageHandle) -> Result<()>;
}
