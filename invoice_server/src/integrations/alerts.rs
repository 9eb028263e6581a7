use async_trait::async_trait;
use invoice_engine::traits::{AlertSink, CollaboratorError};
use reqwest::Method;
use serde::Serialize;

use super::RestClient;

#[derive(Debug, Serialize)]
struct Alert<'a> {
    source: &'static str,
    message: &'a str,
}

/// Posts alerts to a webhook.
#[derive(Clone)]
pub struct AlertClient {
    client: RestClient,
}

impl AlertClient {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSink for AlertClient {
    async fn send_alert(&self, message: &str) -> Result<(), CollaboratorError> {
        let alert = Alert { source: env!("CARGO_PKG_NAME"), message };
        self.client.command(Method::POST, "", Some(alert)).await
    }
}
