// Publisher trait for relaying derived state
use async_trait::async_trait;

#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// Publish a text payload on a channel of the message transport
    async fn publish(&self, channel: &str, payload: String) -> anyhow::Result<()>;
}
