use {
    crate::{
        Error, IrcMessage, Result, TwitchSink, handlers, irc,
        sink::{Outbound, Outbox, forward},
    },
    chattext_channels::CommandRegistry,
    chattext_config::TwitchConfig,
    futures::{SinkExt, StreamExt},
    secrecy::{ExposeSecret, Secret},
    std::{num::NonZeroU32, sync::Arc, time::Duration},
    tokio::sync::mpsc,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Resolved login details for one bot connection.
pub struct ConnectionSettings {
    pub url: String,
    pub nick: String,
    pub token: Secret<String>,
    pub channels: Vec<String>,
    /// Outbound messages allowed per `rate_limit_window`.
    pub rate_limit_messages: NonZeroU32,
    pub rate_limit_window: Duration,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("nick", &self.nick)
            .field("token", &"[REDACTED]")
            .field("channels", &self.channels)
            .field("rate_limit_messages", &self.rate_limit_messages)
            .field("rate_limit_window", &self.rate_limit_window)
            .finish()
    }
}

impl TryFrom<&TwitchConfig> for ConnectionSettings {
    type Error = Error;

    fn try_from(config: &TwitchConfig) -> Result<Self> {
        let rate_limit_messages = NonZeroU32::new(config.rate_limit_messages).ok_or_else(|| {
            chattext_common::Error::invalid_argument("twitch.rate_limit_messages", "must be at least 1")
        })?;
        if config.rate_limit_window_secs == 0 {
            return Err(chattext_common::Error::invalid_argument(
                "twitch.rate_limit_window_secs",
                "must be at least 1",
            )
            .into());
        }
        Ok(Self {
            url: config.url.clone(),
            nick: config.require_nick()?,
            token: config.require_irc_token()?,
            channels: config.require_channels()?,
            rate_limit_messages,
            rate_limit_window: Duration::from_secs(config.rate_limit_window_secs),
        })
    }
}

/// How a single WebSocket session ended.
enum Session {
    /// Server closed or asked us to reconnect.
    Closed,
    /// Cancellation fired; stop for good.
    Shutdown,
}

/// Long-lived Twitch chat connection with auto-reconnect.
pub struct TwitchConnection {
    settings: ConnectionSettings,
    registry: Arc<CommandRegistry>,
    outbox: Outbox,
    write_rx: mpsc::UnboundedReceiver<Outbound>,
}

impl TwitchConnection {
    pub fn new(settings: ConnectionSettings, registry: Arc<CommandRegistry>) -> Self {
        // wss:// needs a process-wide crypto provider; ignore if already set.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let (outbox, write_rx) = Outbox::new(settings.rate_limit_messages, settings.rate_limit_window);
        Self {
            settings,
            registry,
            outbox,
            write_rx,
        }
    }

    /// A sink writing to `channel` through this connection.
    ///
    /// Sends wait while the connection is down and fail once it shuts down.
    pub fn sink(&self, channel: impl Into<String>) -> TwitchSink {
        TwitchSink::new(channel, self.outbox.clone())
    }

    /// Connect, serve commands, and reconnect with exponential backoff until
    /// `cancel` fires. Only a rejected login ends the loop with an error.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            info!(url = %self.settings.url, nick = %self.settings.nick, "connecting to twitch");

            match connect_and_run(
                &self.settings,
                &self.registry,
                &self.outbox,
                &mut self.write_rx,
                &cancel,
                &mut backoff,
            )
            .await
            {
                Ok(Session::Shutdown) => {
                    info!("twitch connection shut down");
                    return Ok(());
                },
                Ok(Session::Closed) => {
                    debug!("twitch connection closed");
                },
                Err(Error::Auth(message)) => {
                    error!(%message, "twitch rejected the login");
                    return Err(Error::Auth(message));
                },
                Err(e) => {
                    error!(error = %e, "twitch connection error");
                },
            }

            info!(delay_ms = backoff.as_millis(), "reconnecting after delay");
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(backoff) => {},
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }
}

/// Single session: log in, join, then pump lines both ways.
async fn connect_and_run(
    settings: &ConnectionSettings,
    registry: &Arc<CommandRegistry>,
    outbox: &Outbox,
    write_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    cancel: &CancellationToken,
    backoff: &mut Duration,
) -> Result<Session> {
    let (ws_stream, _response) = connect_async(settings.url.as_str()).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();

    let login = [
        irc::cap_req(),
        irc::pass(settings.token.expose_secret()),
        irc::nick(&settings.nick),
        irc::join(&settings.channels),
    ];
    for line in login {
        ws_sink.send(Message::Text(line.into())).await?;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                return Ok(Session::Shutdown);
            },
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        for line in text.as_str().lines() {
                            let Some(message) = IrcMessage::parse(line) else {
                                continue;
                            };
                            match message.command.as_str() {
                                "PING" => {
                                    let pong = irc::pong(message.trailing());
                                    ws_sink.send(Message::Text(pong.into())).await?;
                                },
                                "001" => {
                                    info!(nick = %settings.nick, "logged in to twitch");
                                    *backoff = INITIAL_BACKOFF;
                                },
                                "JOIN" => {
                                    debug!(channel = message.params.first().map(String::as_str), "joined");
                                },
                                "RECONNECT" => {
                                    info!("twitch requested a reconnect");
                                    return Ok(Session::Closed);
                                },
                                "NOTICE" if is_login_failure(&message) => {
                                    return Err(Error::Auth(
                                        message.trailing().unwrap_or_default().to_string(),
                                    ));
                                },
                                "NOTICE" => {
                                    warn!(notice = message.trailing(), "twitch notice");
                                },
                                "PRIVMSG" => {
                                    let _ = handlers::dispatch(registry, &settings.nick, &message, outbox);
                                },
                                _ => {},
                            }
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket closed by server");
                        return Ok(Session::Closed);
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(Error::WebSocket(e)),
                }
            },
            outbound = write_rx.recv() => {
                match outbound {
                    Some(outbound) => forward(&mut ws_sink, outbound).await?,
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        return Ok(Session::Shutdown);
                    },
                }
            },
        }
    }
}

fn is_login_failure(message: &IrcMessage) -> bool {
    message.trailing().is_some_and(|text| {
        text.contains("Login authentication failed") || text.contains("Improperly formatted auth")
    })
}
