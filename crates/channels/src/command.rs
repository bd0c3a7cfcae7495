use {async_trait::async_trait, chattext_common::text::cleaned_splits, tracing::debug};

use crate::{ChatSink, MessageDelivery, Result, gating};

/// An incoming chat line addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Channel the line was posted in, without the leading `#`.
    pub channel: String,
    /// Login name of the issuer.
    pub author: String,
    /// Whether the issuer has moderator rights in `channel`.
    pub is_moderator: bool,
    /// Full message text, command word included.
    pub text: String,
}

impl ChatRequest {
    /// Whitespace-separated words of the message, command word included.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        cleaned_splits(&self.text)
    }

    /// Everything after the command word, trimmed.
    #[must_use]
    pub fn rest(&self) -> &str {
        self.text
            .trim_start()
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or("")
    }
}

/// Handles one kind of chat command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command word without the prefix (e.g. "dump").
    fn name(&self) -> &str;

    /// Handle an incoming request, replying through `reply`.
    async fn handle(&self, request: &ChatRequest, reply: &dyn ChatSink) -> Result<()>;
}

/// `!say <text>`: the channel owner relays text through protocol-safe delivery.
pub struct SayCommand {
    delivery: MessageDelivery,
}

impl SayCommand {
    #[must_use]
    pub fn new(delivery: MessageDelivery) -> Self {
        Self { delivery }
    }
}

#[async_trait]
impl CommandHandler for SayCommand {
    fn name(&self) -> &str {
        "say"
    }

    async fn handle(&self, request: &ChatRequest, reply: &dyn ChatSink) -> Result<()> {
        if !gating::is_channel_owner(request) {
            debug!(channel = %request.channel, author = %request.author, "ignoring say from non-owner");
            return Ok(());
        }
        self.delivery.deliver(reply, request.rest()).await?;
        Ok(())
    }
}
