use async_trait::async_trait;

use crate::Result;

/// A chat destination: one channel on one connection.
///
/// Implementations send exactly the text they are given. Size limits,
/// splitting, and retries are [`MessageDelivery`](crate::MessageDelivery)'s job.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Channel name used in logs.
    fn target(&self) -> &str;

    /// Send one message.
    async fn send_text(&self, text: &str) -> Result<()>;
}
