use async_trait::async_trait;
use invoice_engine::traits::{CollaboratorError, MessagePublisher, PublishError};

use super::RestClient;

/// Publishes to the message bus's HTTP gateway: every payload is posted verbatim to `{bus_url}/topics/{topic}`.
#[derive(Clone)]
pub struct HttpBusPublisher {
    client: RestClient,
}

impl HttpBusPublisher {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessagePublisher for HttpBusPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let path = format!("/topics/{topic}");
        self.client.post_raw(&path, payload.to_vec()).await.map_err(|e| match e {
            CollaboratorError::Rejected(m) => PublishError::Rejected(m),
            e => PublishError::Unavailable(e.to_string()),
        })
    }
}
