//! Twitch chat transport: IRC over a secure WebSocket.

pub mod connection;
pub mod error;
pub mod handlers;
pub mod irc;
pub mod sink;

pub use {
    connection::{ConnectionSettings, TwitchConnection},
    error::{Error, Result},
    irc::IrcMessage,
    sink::TwitchSink,
};
