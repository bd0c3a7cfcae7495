use std::sync::Arc;

use {
    chattext_channels::{ChatRequest, CommandRegistry},
    tokio::task::JoinHandle,
    tracing::{debug, warn},
};

use crate::{IrcMessage, TwitchSink, sink::Outbox};

/// Route one incoming line to its command handler.
///
/// Each command runs on its own task so a long dump never blocks the reader.
/// Returns the task handle when a command was started.
pub fn dispatch(
    registry: &Arc<CommandRegistry>,
    own_nick: &str,
    message: &IrcMessage,
    outbox: &Outbox,
) -> Option<JoinHandle<()>> {
    let request = message.to_chat_request()?;
    if request.author.eq_ignore_ascii_case(own_nick) {
        return None;
    }
    let handler = registry.resolve(&request.text)?;

    debug!(
        command = handler.name(),
        channel = %request.channel,
        author = %request.author,
        "dispatching chat command"
    );
    let sink = TwitchSink::new(request.channel.clone(), outbox.clone());
    Some(tokio::spawn(async move {
        run_command(handler, request, sink).await;
    }))
}

async fn run_command(
    handler: Arc<dyn chattext_channels::CommandHandler>,
    request: ChatRequest,
    sink: TwitchSink,
) {
    if let Err(e) = handler.handle(&request, &sink).await {
        warn!(
            command = handler.name(),
            channel = %request.channel,
            error = %e,
            "chat command failed"
        );
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sink::forward,
        async_trait::async_trait,
        chattext_channels::{ChatSink, CommandHandler, Result},
        futures::{SinkExt, StreamExt},
        std::{num::NonZeroU32, time::Duration},
        tokio_tungstenite::tungstenite::{self, Message},
    };

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, request: &ChatRequest, reply: &dyn ChatSink) -> Result<()> {
            reply.send_text(request.rest()).await
        }
    }

    fn registry() -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new("!");
        registry.register(Arc::new(Echo));
        Arc::new(registry)
    }

    fn line(author: &str, text: &str) -> IrcMessage {
        IrcMessage::parse(&format!(
            "@mod=0 :{author}!{author}@{author}.tmi.twitch.tv PRIVMSG #streamer :{text}"
        ))
        .unwrap()
    }

    /// An outbox drained into an in-memory socket; yields the written frames.
    fn outbox() -> (Outbox, futures::channel::mpsc::UnboundedReceiver<Message>) {
        let (outbox, mut queue) = Outbox::new(NonZeroU32::new(20).unwrap(), Duration::from_secs(30));
        let (socket, written) = futures::channel::mpsc::unbounded::<Message>();
        tokio::spawn(async move {
            let mut socket = socket.sink_map_err(|_| tungstenite::Error::ConnectionClosed);
            while let Some(outbound) = queue.recv().await {
                forward(&mut socket, outbound).await.unwrap();
            }
        });
        (outbox, written)
    }

    #[tokio::test]
    async fn runs_matching_command() {
        let (tx, mut written) = outbox();

        let task = dispatch(&registry(), "bot", &line("viewer", "!echo hi there"), &tx).unwrap();
        task.await.unwrap();

        match written.next().await {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), "PRIVMSG #streamer :hi there"),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn skips_plain_chat_and_own_lines() {
        let (tx, _written) = outbox();
        let registry = registry();

        assert!(dispatch(&registry, "bot", &line("viewer", "echo hi"), &tx).is_none());
        assert!(dispatch(&registry, "bot", &line("viewer", "!unknown"), &tx).is_none());
        assert!(dispatch(&registry, "bot", &line("bot", "!echo loop"), &tx).is_none());
        let ping = IrcMessage::parse("PING :tmi.twitch.tv").unwrap();
        assert!(dispatch(&registry, "bot", &ping, &tx).is_none());
    }
}
