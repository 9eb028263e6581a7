use async_trait::async_trait;
use invoice_engine::traits::{CollaboratorError, PriceOracle};
use reqwest::Method;
use serde::Deserialize;

use super::RestClient;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

/// Fetches USD quotes from the price service: `GET {price_url}/prices/{symbol}`.
#[derive(Clone)]
pub struct PriceClient {
    client: RestClient,
}

impl PriceClient {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceOracle for PriceClient {
    async fn get_price(&self, symbol: &str) -> Result<f64, CollaboratorError> {
        let path = format!("/prices/{}", symbol.trim().to_uppercase());
        let response: PriceResponse = self.client.query(Method::GET, &path, None::<()>).await?;
        Ok(response.price)
    }
}
