use async_trait::async_trait;
use invoice_engine::{
    db_types::{ClientId, InvoiceId},
    traits::{CollaboratorError, CustodyService},
};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::RestClient;

#[derive(Debug, Serialize)]
struct AcceptCryptoRequest<'a> {
    invoice_id: &'a str,
    chain: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AcceptCryptoResponse {
    address: String,
}

#[derive(Debug, Serialize)]
struct CancelAcceptingRequest<'a> {
    invoice_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    client_id: &'a str,
    invoice_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    tx_hash: String,
}

/// Talks to the custody service's REST API.
#[derive(Clone)]
pub struct CustodyClient {
    client: RestClient,
}

impl CustodyClient {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CustodyService for CustodyClient {
    async fn accept_crypto(
        &self,
        invoice_id: &InvoiceId,
        chain: &str,
        token: &str,
    ) -> Result<String, CollaboratorError> {
        let body = AcceptCryptoRequest { invoice_id: invoice_id.as_str(), chain, token };
        let response: AcceptCryptoResponse = self.client.query(Method::POST, "/accept-crypto", Some(body)).await?;
        if response.address.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(format!("No address issued for invoice {invoice_id}")));
        }
        Ok(response.address)
    }

    async fn cancel_accepting_crypto(&self, invoice_id: &InvoiceId) -> Result<(), CollaboratorError> {
        let body = CancelAcceptingRequest { invoice_id: invoice_id.as_str() };
        self.client.command(Method::POST, "/cancel-accepting-crypto", Some(body)).await
    }

    async fn transfer(
        &self,
        client_id: &ClientId,
        invoice_id: &InvoiceId,
        gas_limit: Option<i64>,
    ) -> Result<String, CollaboratorError> {
        let body = TransferRequest { client_id: client_id.as_str(), invoice_id: invoice_id.as_str(), gas_limit };
        let response: TransferResponse = self.client.query(Method::POST, "/transfer", Some(body)).await?;
        Ok(response.tx_hash)
    }
}
