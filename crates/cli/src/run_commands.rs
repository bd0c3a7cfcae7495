use std::sync::Arc;

use {
    anyhow::Result,
    chattext_channels::{CommandRegistry, DeliveryConfig, MessageDelivery, SayCommand},
    chattext_config::ChatTextConfig,
    chattext_dump::{DumpCommand, DumpPipeline, StreamConfig},
    chattext_twitch::{ConnectionSettings, TwitchConnection},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

/// Build the command set a connection serves.
fn build_registry(config: &ChatTextConfig, cancel: &CancellationToken) -> Result<CommandRegistry> {
    let delivery = MessageDelivery::new(DeliveryConfig::try_from(&config.delivery)?);
    let stream = StreamConfig::try_from(&config.dump)?;
    let pipeline = Arc::new(DumpPipeline::new(stream, delivery.clone()));

    let mut registry = CommandRegistry::new(config.twitch.command_prefix.clone());
    registry.register(Arc::new(DumpCommand::new(pipeline, cancel.child_token())));
    registry.register(Arc::new(SayCommand::new(delivery)));
    Ok(registry)
}

/// Connect to Twitch and serve chat commands until Ctrl-C.
pub async fn run(config: &ChatTextConfig) -> Result<()> {
    let settings = ConnectionSettings::try_from(&config.twitch)?;
    let cancel = CancellationToken::new();
    let registry = build_registry(config, &cancel)?;

    info!(
        nick = %settings.nick,
        channels = ?settings.channels,
        commands = ?registry.list(),
        "starting chat bot"
    );

    crate::cancel_on_ctrl_c(cancel.clone());
    TwitchConnection::new(settings, Arc::new(registry))
        .run(cancel)
        .await?;
    Ok(())
}
