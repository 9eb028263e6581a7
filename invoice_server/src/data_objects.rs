use std::fmt::Display;

use invoice_engine::{
    db_types::{ClientId, InvoiceStatus},
    InvoiceListFilter,
    Pagination,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoiceParams {
    pub client_id: ClientId,
    pub usd_cents_amount: i64,
}

/// The chain and token the payer has chosen for an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentChoiceParams {
    pub chain: String,
    pub token: String,
    #[serde(default)]
    pub payer_client_id: Option<ClientId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasLimitParams {
    pub gas_limit: i64,
}

/// Query string for the invoice search endpoint, e.g. `?client_id=merchant&status=PENDING&limit=20`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceSearchParams {
    pub client_id: Option<ClientId>,
    pub status: Option<InvoiceStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl InvoiceSearchParams {
    pub fn filter(&self) -> InvoiceListFilter {
        let mut filter = InvoiceListFilter::default();
        if let Some(client_id) = &self.client_id {
            filter = filter.with_client_id(client_id.clone());
        }
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        filter
    }

    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination::new(self.limit.unwrap_or(default.limit), self.offset.unwrap_or(default.offset))
    }
}
