use async_trait::async_trait;

use super::CollaboratorError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, message: &str) -> Result<(), CollaboratorError>;
}
