use std::{fmt::Debug, sync::Arc, time::Duration};

use ipg_common::UsdCents;
use log::*;

use crate::{
    db::traits::{InvoiceManagement, Pagination},
    db_types::{ClientId, Invoice, InvoiceId, InvoiceStatus, InvoiceUpdate, NewInvoice},
    ipe_api::{
        errors::InvoiceApiError,
        invoice_objects::{InvoiceListFilter, UpdateInvoiceRequest},
    },
    traits::{with_timeout, CustodyService, PriceOracle},
};

pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// `InvoiceFlowApi` is the primary API for creating invoices and moving them through the first steps of their
/// lifecycle. Settlement and expiry happen in the background workers (see [`crate::workers`]).
pub struct InvoiceFlowApi<B> {
    db: B,
    custody: Arc<dyn CustodyService>,
    prices: Arc<dyn PriceOracle>,
    call_timeout: Duration,
}

impl<B> Debug for InvoiceFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceFlowApi")
    }
}

impl<B> InvoiceFlowApi<B> {
    pub fn new(db: B, custody: Arc<dyn CustodyService>, prices: Arc<dyn PriceOracle>) -> Self {
        Self { db, custody, prices, call_timeout: DEFAULT_COLLABORATOR_TIMEOUT }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InvoiceFlowApi<B>
where B: InvoiceManagement
{
    /// Creates a new invoice for `client_id` over `amount`. The invoice starts out as `NEW`. Nothing outside the
    /// database is touched.
    pub async fn create_invoice(&self, client_id: ClientId, amount: UsdCents) -> Result<Invoice, InvoiceApiError> {
        if !amount.is_positive() {
            return Err(InvoiceApiError::InvalidAmount(amount));
        }
        let invoice = self.db.insert_invoice(NewInvoice::new(client_id, amount)).await?;
        info!("🔄️🧾️ Invoice {} created for {} ({})", invoice.id, invoice.client_id, invoice.usd_cents_amount);
        Ok(invoice)
    }

    /// Chooses the chain and token for a `NEW` invoice.
    ///
    /// Custody is asked for a deposit address, and the oracle for the token price, from which the token amount is
    /// fixed. The invoice then moves to `PENDING`. If either collaborator fails, the stored invoice is left untouched.
    pub async fn update_invoice(&self, request: UpdateInvoiceRequest) -> Result<Invoice, InvoiceApiError> {
        let invoice = self.check_invoice(&request.invoice_id).await?;
        match invoice.status {
            InvoiceStatus::New => {},
            InvoiceStatus::Success => return Err(InvoiceApiError::AlreadyCompleted(invoice.id)),
            status => return Err(InvoiceApiError::InvalidState { id: invoice.id, status }),
        }
        let UpdateInvoiceRequest { invoice_id, chain, token, payer_client_id } = request;
        let address =
            with_timeout(self.call_timeout, self.custody.accept_crypto(&invoice_id, &chain, &token)).await.map_err(
                |e| {
                    warn!("🔄️🧾️ Custody could not issue an address for invoice {invoice_id}. {e}");
                    e
                },
            )?;
        let price = with_timeout(self.call_timeout, self.prices.get_price(&token)).await.map_err(|e| {
            warn!("🔄️🧾️ Could not fetch the {token} price for invoice {invoice_id}. {e}");
            e
        })?;
        let token_amount = token_amount_for(invoice.usd_cents_amount, price)
            .ok_or_else(|| InvoiceApiError::InvalidPrice { symbol: token.clone(), price })?;
        let mut update = InvoiceUpdate::transition(invoice_id, InvoiceStatus::New, InvoiceStatus::Pending)
            .with_chain(chain)
            .with_token(token)
            .with_address(address)
            .with_token_amount(token_amount);
        if let Some(payer) = payer_client_id {
            update = update.with_payer_client_id(payer);
        }
        let invoice = self.db.update_invoice(update).await?;
        info!(
            "🔄️🧾️ Invoice {} is awaiting {token_amount} {} on {} at {}",
            invoice.id,
            invoice.token.as_deref().unwrap_or_default(),
            invoice.chain.as_deref().unwrap_or_default(),
            invoice.address.as_deref().unwrap_or_default()
        );
        Ok(invoice)
    }

    pub async fn check_invoice(&self, invoice_id: &InvoiceId) -> Result<Invoice, InvoiceApiError> {
        self.db.fetch_invoice(invoice_id).await?.ok_or_else(|| InvoiceApiError::InvoiceNotFound(invoice_id.clone()))
    }

    pub async fn list_invoices(
        &self,
        filter: InvoiceListFilter,
        pagination: Pagination,
    ) -> Result<Vec<Invoice>, InvoiceApiError> {
        let invoices = self.db.fetch_invoices(filter.into(), pagination).await?;
        trace!("🔄️🧾️ {} invoices listed", invoices.len());
        Ok(invoices)
    }

    /// Operator override of an invoice status. Only moves permitted by the lifecycle graph are accepted.
    pub async fn update_invoice_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, InvoiceApiError> {
        let invoice = self.check_invoice(invoice_id).await?;
        if !invoice.status.can_transition_to(status) {
            return Err(InvoiceApiError::InvalidTransition { id: invoice.id, from: invoice.status, to: status });
        }
        let update = InvoiceUpdate::transition(invoice.id, invoice.status, status);
        let updated = self.db.update_invoice(update).await?;
        info!("🔄️🧾️ Invoice {invoice_id} manually moved from {} to {status}", invoice.status);
        Ok(updated)
    }

    /// Sets the fee ceiling used for the outbound transfer of a live invoice. The settlement worker picks it up on its
    /// next attempt.
    pub async fn set_gas_limit(&self, invoice_id: &InvoiceId, gas_limit: i64) -> Result<Invoice, InvoiceApiError> {
        if gas_limit <= 0 {
            return Err(InvoiceApiError::InvalidGasLimit(gas_limit));
        }
        let invoice = self.check_invoice(invoice_id).await?;
        match invoice.status {
            InvoiceStatus::Success => return Err(InvoiceApiError::AlreadyCompleted(invoice.id)),
            status if status.is_terminal() => return Err(InvoiceApiError::InvalidState { id: invoice.id, status }),
            _ => {},
        }
        let update = InvoiceUpdate::new(invoice.id).expecting(invoice.status).with_gas_limit(gas_limit);
        let updated = self.db.update_invoice(update).await?;
        info!("🔄️🧾️ Gas limit for invoice {invoice_id} set to {gas_limit}");
        Ok(updated)
    }
}

/// `(usd_cents / 100) / price`, or `None` if the price is not a positive, finite number.
pub fn token_amount_for(amount: UsdCents, price_usd: f64) -> Option<f64> {
    if !price_usd.is_finite() || price_usd <= 0.0 {
        return None;
    }
    Some(amount.as_dollars() / price_usd)
}
