use std::{num::NonZeroU32, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    chattext_channels::{ChatSink, Error, Result},
    futures::{Sink, SinkExt},
    governor::{
        Quota, RateLimiter,
        clock::DefaultClock,
        state::{InMemoryState, NotKeyed},
    },
    tokio::sync::{mpsc, oneshot},
    tokio_tungstenite::tungstenite::{self, Message},
};

use crate::irc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One queued line and the channel its write result is reported on.
pub struct Outbound {
    line: String,
    ack: oneshot::Sender<std::result::Result<(), String>>,
}

/// Shared handle on a connection's outbound queue and its chat rate limit.
///
/// The queue outlives individual WebSocket sessions: lines queued while
/// disconnected go out on the next session.
#[derive(Clone)]
pub struct Outbox {
    queue: mpsc::UnboundedSender<Outbound>,
    limiter: Arc<DirectLimiter>,
}

impl Outbox {
    /// Allow `messages` per `window`, bursting up to the full allowance.
    pub fn new(messages: NonZeroU32, window: Duration) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let quota = Quota::with_period(window / messages.get())
            .unwrap_or_else(|| Quota::per_second(messages))
            .allow_burst(messages);
        let (queue, rx) = mpsc::unbounded_channel();
        let outbox = Self {
            queue,
            limiter: Arc::new(RateLimiter::direct(quota)),
        };
        (outbox, rx)
    }

    /// Wait for rate-limit capacity, queue `line`, and wait for the writer to
    /// report whether it reached the socket.
    pub async fn send_line(&self, line: String) -> Result<()> {
        self.limiter.until_ready().await;

        let (ack, written) = oneshot::channel();
        self.queue
            .send(Outbound { line, ack })
            .map_err(|_| Error::unavailable("twitch connection is shut down"))?;

        match written.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(Error::unavailable(reason)),
            Err(_) => Err(Error::unavailable("twitch connection is shut down")),
        }
    }
}

/// Write one queued line and report the outcome to its sender.
pub(crate) async fn forward<S>(ws_sink: &mut S, outbound: Outbound) -> crate::Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match ws_sink.send(Message::Text(outbound.line.into())).await {
        Ok(()) => {
            let _ = outbound.ack.send(Ok(()));
            Ok(())
        },
        Err(e) => {
            let _ = outbound.ack.send(Err(format!("websocket write failed: {e}")));
            Err(e.into())
        },
    }
}

/// One joined channel, written through the connection's [`Outbox`].
#[derive(Clone)]
pub struct TwitchSink {
    channel: String,
    outbox: Outbox,
}

impl TwitchSink {
    pub fn new(channel: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            channel: channel.into(),
            outbox,
        }
    }
}

#[async_trait]
impl ChatSink for TwitchSink {
    fn target(&self) -> &str {
        &self.channel
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.outbox.send_line(irc::privmsg(&self.channel, text)).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chattext_channels::{DeliveryConfig, MessageDelivery},
        futures::StreamExt,
        std::time::Instant,
    };

    fn outbox(messages: u32, window: Duration) -> (Outbox, mpsc::UnboundedReceiver<Outbound>) {
        Outbox::new(NonZeroU32::new(messages).unwrap(), window)
    }

    /// A WebSocket write half whose peer is gone.
    fn dead_socket() -> impl Sink<Message, Error = tungstenite::Error> + Unpin {
        let (tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        drop(rx);
        tx.sink_map_err(|_| tungstenite::Error::ConnectionClosed)
    }

    fn live_socket() -> (
        impl Sink<Message, Error = tungstenite::Error> + Unpin,
        futures::channel::mpsc::UnboundedReceiver<Message>,
    ) {
        let (tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        (tx.sink_map_err(|_| tungstenite::Error::ConnectionClosed), rx)
    }

    fn text_of(message: Option<Message>) -> String {
        match message {
            Some(Message::Text(text)) => text.as_str().to_string(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn written_line_is_acknowledged() {
        let (outbox, mut rx) = outbox(20, Duration::from_secs(30));
        let sink = TwitchSink::new("streamer", outbox);
        let (mut socket, mut written) = live_socket();

        let send = tokio::spawn(async move { sink.send_text("hello chat").await });
        forward(&mut socket, rx.recv().await.unwrap()).await.unwrap();

        send.await.unwrap().unwrap();
        assert_eq!(text_of(written.next().await), "PRIVMSG #streamer :hello chat");
    }

    #[tokio::test]
    async fn failed_write_is_retried_on_the_next_session() {
        let (outbox, mut rx) = outbox(20, Duration::from_secs(30));
        let sink = TwitchSink::new("streamer", outbox);
        let delivery = MessageDelivery::new(
            DeliveryConfig::new(500, 450, 5, Duration::from_millis(10)).unwrap(),
        );
        let deliver = tokio::spawn(async move { delivery.deliver(&sink, "hello chat").await });

        let mut dead = dead_socket();
        assert!(forward(&mut dead, rx.recv().await.unwrap()).await.is_err());

        let (mut socket, mut written) = live_socket();
        forward(&mut socket, rx.recv().await.unwrap()).await.unwrap();

        assert_eq!(deliver.await.unwrap().unwrap(), 1);
        assert_eq!(text_of(written.next().await), "PRIVMSG #streamer :hello chat");
    }

    #[tokio::test]
    async fn repeated_write_failure_reaches_delivery() {
        let (outbox, mut rx) = outbox(20, Duration::from_secs(30));
        let sink = TwitchSink::new("streamer", outbox);
        let delivery = MessageDelivery::new(
            DeliveryConfig::new(500, 450, 5, Duration::from_millis(10)).unwrap(),
        );
        let deliver = tokio::spawn(async move { delivery.deliver(&sink, "hello chat").await });

        for _ in 0..2 {
            let mut dead = dead_socket();
            assert!(forward(&mut dead, rx.recv().await.unwrap()).await.is_err());
        }

        let err = deliver.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::SendFailed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn sends_wait_for_rate_limit_capacity() {
        // Burst of two, then one message every 100 ms.
        let (outbox, mut rx) = outbox(2, Duration::from_millis(200));
        tokio::spawn(async move {
            while let Some(outbound) = rx.recv().await {
                let _ = outbound.ack.send(Ok(()));
            }
        });
        let sink = TwitchSink::new("streamer", outbox);

        let started = Instant::now();
        for i in 0..2 {
            sink.send_text(&format!("burst {i}")).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(100));

        for i in 0..2 {
            sink.send_text(&format!("paced {i}")).await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn closed_queue_is_unavailable() {
        let (outbox, rx) = outbox(20, Duration::from_secs(30));
        drop(rx);
        let sink = TwitchSink::new("streamer", outbox);

        let err = sink.send_text("hello").await.unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn dropped_writer_is_unavailable() {
        let (outbox, mut rx) = outbox(20, Duration::from_secs(30));
        let sink = TwitchSink::new("streamer", outbox);

        let send = tokio::spawn(async move { sink.send_text("hello").await });
        drop(rx.recv().await.unwrap());

        let err = send.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }
}
