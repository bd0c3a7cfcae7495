/// Config schema types: Twitch credentials, delivery limits, dump settings.
use std::{collections::BTreeSet, path::PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Twitch chat message size limit, in characters.
pub const TWITCH_MAX_MESSAGE_LEN: usize = 500;

/// Smallest soft split target accepted for a delivery.
pub const MIN_TARGET_LENGTH: usize = 300;

pub const DEFAULT_TARGET_LENGTH: usize = 450;
pub const DEFAULT_MAX_MESSAGE_COUNT: usize = 5;
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 40;

pub const DEFAULT_BUFFER_FLUSH_THRESHOLD: usize = 128;
pub const MAX_BUFFER_FLUSH_THRESHOLD: usize = 2048;
pub const DEFAULT_SUPPLEMENTAL_LINE_CHANCE: f64 = 0.02;
pub const DEFAULT_SUPPLEMENTAL_LINES_FILE: &str = "additionalLines.txt";

pub const DEFAULT_TWITCH_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Twitch's chat allowance for accounts without moderator rights.
pub const DEFAULT_RATE_LIMIT_MESSAGES: u32 = 20;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 30;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatTextConfig {
    pub twitch: TwitchConfig,
    pub delivery: DeliverySection,
    pub dump: DumpSection,
}

/// Credentials and channel list for the Twitch IRC connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    /// Login name of the bot account.
    pub nick: String,

    /// IRC auth token, with or without the `oauth:` prefix.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Channels to join.
    pub channels: Vec<String>,

    /// Prefix that marks a chat line as a command.
    pub command_prefix: String,

    /// IRC-over-WebSocket endpoint.
    pub url: String,

    /// Messages allowed per `rate_limit_window_secs`, across all channels.
    pub rate_limit_messages: u32,

    pub rate_limit_window_secs: u64,
}

impl std::fmt::Debug for TwitchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchConfig")
            .field("nick", &self.nick)
            .field("token", &"[REDACTED]")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            nick: String::new(),
            token: Secret::new(String::new()),
            channels: Vec::new(),
            command_prefix: "!".into(),
            url: DEFAULT_TWITCH_IRC_URL.into(),
            rate_limit_messages: DEFAULT_RATE_LIMIT_MESSAGES,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

impl TwitchConfig {
    pub fn require_nick(&self) -> Result<String> {
        let nick = self.nick.trim();
        if nick.is_empty() {
            return Err(Error::invalid_argument("twitch.nick", "value is empty"));
        }
        Ok(nick.to_lowercase())
    }

    /// Channel names lowercased, deduplicated, and sorted.
    pub fn require_channels(&self) -> Result<Vec<String>> {
        let channels: BTreeSet<String> = self
            .channels
            .iter()
            .map(|c| c.trim().trim_start_matches('#').to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        if channels.is_empty() {
            return Err(Error::invalid_argument(
                "twitch.channels",
                "at least one channel is required",
            ));
        }
        Ok(channels.into_iter().collect())
    }

    /// Token in the `oauth:<token>` form IRC expects.
    pub fn require_irc_token(&self) -> Result<Secret<String>> {
        let raw = self.token.expose_secret().trim();
        let bare = raw.strip_prefix("oauth:").unwrap_or(raw);
        if bare.is_empty() {
            return Err(Error::invalid_argument("twitch.token", "value is empty"));
        }
        Ok(Secret::new(format!("oauth:{bare}")))
    }
}

/// Limits applied when splitting and sending one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    /// Hard per-message ceiling, in characters.
    pub max_message_length: usize,
    /// Soft split target; split points land strictly before it.
    pub per_message_target_length: usize,
    /// Largest number of chunks one payload may become.
    pub max_message_count: usize,
    /// Delay before the single retry of a failed send.
    pub retry_backoff_secs: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            max_message_length: TWITCH_MAX_MESSAGE_LEN,
            per_message_target_length: DEFAULT_TARGET_LENGTH,
            max_message_count: DEFAULT_MAX_MESSAGE_COUNT,
            retry_backoff_secs: DEFAULT_RETRY_BACKOFF_SECS,
        }
    }
}

/// Settings for the `dump` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpSection {
    /// Non-blank lines accumulated before the buffer is flushed.
    pub buffer_flush_threshold: usize,
    /// Probability in `[0, 1]` of appending a supplemental line to a flush.
    pub supplemental_line_chance: f64,
    /// Side file of candidate supplemental lines. May be absent.
    pub supplemental_lines_file: PathBuf,
}

impl Default for DumpSection {
    fn default() -> Self {
        Self {
            buffer_flush_threshold: DEFAULT_BUFFER_FLUSH_THRESHOLD,
            supplemental_line_chance: DEFAULT_SUPPLEMENTAL_LINE_CHANCE,
            supplemental_lines_file: PathBuf::from(DEFAULT_SUPPLEMENTAL_LINES_FILE),
        }
    }
}
