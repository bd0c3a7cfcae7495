use std::{path::Path, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    chattext_channels::{ChatSink, DeliveryConfig, MessageDelivery},
    chattext_config::ChatTextConfig,
    chattext_dump::{DumpPipeline, StdRandom, StreamConfig},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

/// Prints each message on its own line, so a dump can be previewed offline.
struct ConsoleSink;

#[async_trait]
impl ChatSink for ConsoleSink {
    fn target(&self) -> &str {
        "console"
    }

    async fn send_text(&self, text: &str) -> chattext_channels::Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// Run the dump pipeline against stdout with the configured limits.
pub async fn dump_to_console(config: &ChatTextConfig, file: &Path, seed: Option<u64>) -> Result<()> {
    let delivery = MessageDelivery::new(DeliveryConfig::try_from(&config.delivery)?);
    let stream = StreamConfig::try_from(&config.dump)?;
    let random = match seed {
        Some(seed) => StdRandom::seeded(seed),
        None => StdRandom::from_entropy(),
    };
    let pipeline = DumpPipeline::new(stream, delivery).with_random(Arc::new(random));

    let cancel = CancellationToken::new();
    crate::cancel_on_ctrl_c(cancel.clone());

    let summary = pipeline.dump(file, &ConsoleSink, &cancel).await?;
    info!(
        file = %file.display(),
        flushes = summary.flush_count,
        supplemental = summary.supplemental_line_count,
        cancelled = summary.cancelled,
        "{summary}"
    );
    Ok(())
}
