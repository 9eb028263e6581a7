use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("No subscriber is listening on topic {0}")]
    NoRoute(String),
    #[error("The message bus is unavailable: {0}")]
    Unavailable(String),
    #[error("The message bus rejected the message: {0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes `payload` verbatim on `topic`. Returns once the bus has acknowledged the message.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}
