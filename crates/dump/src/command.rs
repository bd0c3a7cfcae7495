use std::{path::Path, sync::Arc};

use {
    async_trait::async_trait,
    chattext_channels::{ChatRequest, ChatSink, CommandHandler, gating},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{DumpPipeline, Error};

/// `!dump <file>`: the channel owner streams a file into the channel.
pub struct DumpCommand {
    pipeline: Arc<DumpPipeline>,
    cancel: CancellationToken,
}

impl DumpCommand {
    /// `cancel` stops every dump started by this command.
    pub fn new(pipeline: Arc<DumpPipeline>, cancel: CancellationToken) -> Self {
        Self { pipeline, cancel }
    }
}

#[async_trait]
impl CommandHandler for DumpCommand {
    fn name(&self) -> &str {
        "dump"
    }

    async fn handle(
        &self,
        request: &ChatRequest,
        reply: &dyn ChatSink,
    ) -> chattext_channels::Result<()> {
        if !gating::is_channel_owner(request) {
            debug!(channel = %request.channel, author = %request.author, "ignoring dump from non-owner");
            return Ok(());
        }
        let args = request.arguments();
        let Some(file) = args.get(1) else {
            warn!(channel = %request.channel, "dump requested without a file name");
            return Ok(());
        };

        info!(channel = %request.channel, file = %file, "starting dump");
        match self
            .pipeline
            .dump(Path::new(file), reply, &self.cancel.child_token())
            .await
        {
            Ok(summary) => {
                info!(
                    channel = %request.channel,
                    file = %file,
                    flushes = summary.flush_count,
                    supplemental = summary.supplemental_line_count,
                    cancelled = summary.cancelled,
                    "{summary}"
                );
                Ok(())
            },
            Err(Error::SourceNotFound { path }) => {
                warn!(channel = %request.channel, path = %path.display(), "file not found");
                Ok(())
            },
            Err(Error::Delivery(e)) => Err(e),
            Err(e) => Err(chattext_channels::Error::external("dump failed", e)),
        }
    }
}
