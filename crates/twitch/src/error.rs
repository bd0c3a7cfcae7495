pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("twitch config: {0}")]
    Config(#[from] chattext_common::Error),

    /// Twitch rejected the login; reconnecting won't help.
    #[error("authentication failed: {0}")]
    Auth(String),
}
