use async_trait::async_trait;

use super::CollaboratorError;
use crate::db_types::{ClientId, InvoiceId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustodyService: Send + Sync {
    /// Asks custody to start accepting `token` on `chain` for the invoice. Returns the deposit address.
    async fn accept_crypto(&self, invoice_id: &InvoiceId, chain: &str, token: &str)
        -> Result<String, CollaboratorError>;

    /// Tells custody to stop watching the deposit address of the invoice.
    async fn cancel_accepting_crypto(&self, invoice_id: &InvoiceId) -> Result<(), CollaboratorError>;

    /// Forwards the funds collected for the invoice to `client_id`. `gas_limit` caps the fee. Without one, custody
    /// applies its own default. Returns the transaction hash.
    async fn transfer(
        &self,
        client_id: &ClientId,
        invoice_id: &InvoiceId,
        gas_limit: Option<i64>,
    ) -> Result<String, CollaboratorError>;
}
