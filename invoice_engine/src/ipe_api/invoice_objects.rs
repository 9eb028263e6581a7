use serde::{Deserialize, Serialize};

use crate::{
    db::traits::InvoiceQueryFilter,
    db_types::{ClientId, InvoiceId, InvoiceStatus},
};

/// The filter accepted by [`super::invoice_flow_api::InvoiceFlowApi::list_invoices`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceListFilter {
    #[serde(default)]
    pub client_ids: Vec<ClientId>,
    #[serde(default)]
    pub invoice_ids: Vec<InvoiceId>,
    #[serde(default)]
    pub statuses: Vec<InvoiceStatus>,
}

impl InvoiceListFilter {
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_ids.push(client_id);
        self
    }

    pub fn with_invoice_id(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_ids.push(invoice_id);
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.statuses.push(status);
        self
    }
}

impl From<InvoiceListFilter> for InvoiceQueryFilter {
    fn from(filter: InvoiceListFilter) -> Self {
        InvoiceQueryFilter {
            ids: filter.invoice_ids,
            client_ids: filter.client_ids,
            statuses: filter.statuses,
            ..Default::default()
        }
    }
}

/// Selects the chain and token an invoice is paid in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub invoice_id: InvoiceId,
    pub chain: String,
    pub token: String,
    #[serde(default)]
    pub payer_client_id: Option<ClientId>,
}

impl UpdateInvoiceRequest {
    pub fn new<S: Into<String>>(invoice_id: InvoiceId, chain: S, token: S) -> Self {
        Self { invoice_id, chain: chain.into(), token: token.into(), payer_client_id: None }
    }

    pub fn with_payer(mut self, payer: ClientId) -> Self {
        self.payer_client_id = Some(payer);
        self
    }
}
