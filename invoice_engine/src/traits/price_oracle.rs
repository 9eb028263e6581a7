use async_trait::async_trait;

use super::CollaboratorError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// The current spot price of one unit of `symbol`, in US dollars.
    async fn get_price(&self, symbol: &str) -> Result<f64, CollaboratorError>;
}
