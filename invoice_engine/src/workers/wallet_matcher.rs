//! The fast settlement path.
//!
//! Wallet balance events are matched to the pending invoice that owns the deposit address. Once the balance covers
//! the invoice, the invoice moves to `SENDING_TO_CLIENT` and a single transfer is tried right away. If that transfer
//! fails, the invoice stays in `SENDING_TO_CLIENT` and the [`super::settlement`] worker takes over.
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::{InvoiceManagement, InvoiceQueryFilter, InvoiceStoreError, Pagination},
    db_types::{Invoice, InvoiceId, InvoiceStatus, InvoiceUpdate},
    events::{EventHandler, Handler, InMemoryBus, WalletBalanceEvent, WALLET_BALANCES_TOPIC},
    helpers::TokenDecimals,
    ipe_api::errors::InvoiceApiError,
    traits::{with_timeout, CustodyService},
    workers::inflight::{InFlightClaim, InFlightTracker},
};

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub decimals: TokenDecimals,
    /// Tell custody to stop watching the deposit address as soon as the invoice is covered
    pub cancel_accepting_on_match: bool,
    pub call_timeout: Duration,
    pub buffer_size: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            decimals: TokenDecimals::default(),
            cancel_accepting_on_match: true,
            call_timeout: Duration::from_secs(30),
            buffer_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The invoice was covered and the funds have been forwarded.
    Settled { invoice_id: InvoiceId, tx_hash: String },
    /// The invoice was covered, but the transfer failed. The settlement worker will retry it.
    Deferred { invoice_id: InvoiceId },
    /// None of the invoices using the address is waiting for funds. Typical for redelivered events.
    NotPending,
    ChainMismatch { invoice_id: InvoiceId },
    InsufficientFunds { invoice_id: InvoiceId, required: u128, observed: u128 },
    /// A transfer for the invoice is already running.
    AlreadyInFlight { invoice_id: InvoiceId },
}

pub struct WalletEventMatcher<B> {
    db: B,
    custody: Arc<dyn CustodyService>,
    tracker: Arc<dyn InFlightTracker>,
    config: MatcherConfig,
}

impl<B> WalletEventMatcher<B>
where B: InvoiceManagement
{
    pub fn new(
        db: B,
        custody: Arc<dyn CustodyService>,
        tracker: Arc<dyn InFlightTracker>,
        config: MatcherConfig,
    ) -> Self {
        Self { db, custody, tracker, config }
    }

    /// Decodes a raw bus payload and handles the event in it.
    pub async fn handle_message(&self, payload: &[u8]) -> Result<MatchOutcome, InvoiceApiError> {
        let event = WalletBalanceEvent::from_json(payload).map_err(|e| InvoiceApiError::MalformedEvent(e.to_string()))?;
        self.handle_event(event).await
    }

    pub async fn handle_event(&self, event: WalletBalanceEvent) -> Result<MatchOutcome, InvoiceApiError> {
        let address = event.address.trim().to_lowercase();
        let filter = InvoiceQueryFilter::default().with_address(&address);
        let candidates = self.db.fetch_invoices(filter, Pagination::default()).await?;
        if candidates.is_empty() {
            return Err(InvoiceApiError::NotFoundByAddress(address));
        }
        // Candidates are sorted newest first
        let Some(invoice) = candidates.into_iter().find(|i| i.status == InvoiceStatus::Pending) else {
            debug!("👛️ No pending invoice for {address}. Ignoring balance of {}", event.balance);
            return Ok(MatchOutcome::NotPending);
        };
        if !same_asset(&invoice, &event) {
            warn!(
                "👛️ Balance for {address} is in {}/{}, but invoice {} expects {}/{}. Ignoring.",
                event.chain,
                event.token,
                invoice.id,
                invoice.chain.as_deref().unwrap_or_default(),
                invoice.token.as_deref().unwrap_or_default()
            );
            return Ok(MatchOutcome::ChainMismatch { invoice_id: invoice.id });
        }
        let required = self.required_units(&invoice)?;
        if event.balance < required {
            info!("👛️ Invoice {} has received {} of {required} units so far", invoice.id, event.balance);
            return Ok(MatchOutcome::InsufficientFunds { invoice_id: invoice.id, required, observed: event.balance });
        }
        let Some(claim) = InFlightClaim::acquire(&self.tracker, &invoice.id) else {
            debug!("👛️ A transfer for invoice {} is already running", invoice.id);
            return Ok(MatchOutcome::AlreadyInFlight { invoice_id: invoice.id });
        };
        let update =
            InvoiceUpdate::transition(invoice.id.clone(), InvoiceStatus::Pending, InvoiceStatus::SendingToClient);
        match self.db.update_invoice(update).await {
            Ok(_) => info!("👛️ Invoice {} is fully paid ({} units). Forwarding funds.", invoice.id, event.balance),
            Err(InvoiceStoreError::StatusConflict { id, .. }) => {
                debug!("👛️ Invoice {id} was moved on concurrently");
                return Ok(MatchOutcome::NotPending);
            },
            Err(e) => return Err(e.into()),
        }
        if self.config.cancel_accepting_on_match {
            let call = self.custody.cancel_accepting_crypto(&invoice.id);
            if let Err(e) = with_timeout(self.config.call_timeout, call).await {
                warn!("👛️ Could not stop custody from watching {address}. {e}");
            }
        }
        let outcome = self.forward_funds(&invoice).await;
        drop(claim);
        outcome
    }

    async fn forward_funds(&self, invoice: &Invoice) -> Result<MatchOutcome, InvoiceApiError> {
        let transfer = self.custody.transfer(&invoice.client_id, &invoice.id, invoice.gas_limit);
        let tx_hash = match with_timeout(self.config.call_timeout, transfer).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                warn!("👛️ Transfer for invoice {} failed. {e}. Leaving it to the settlement worker.", invoice.id);
                return Ok(MatchOutcome::Deferred { invoice_id: invoice.id.clone() });
            },
        };
        let update =
            InvoiceUpdate::transition(invoice.id.clone(), InvoiceStatus::SendingToClient, InvoiceStatus::Success);
        if let Err(e) = self.db.update_invoice(update).await {
            error!("👛️ Transfer {tx_hash} for invoice {} succeeded but could not be recorded. {e}", invoice.id);
            return Err(e.into());
        }
        info!("👛️ Invoice {} settled. Transaction {tx_hash}", invoice.id);
        Ok(MatchOutcome::Settled { invoice_id: invoice.id.clone(), tx_hash })
    }

    fn required_units(&self, invoice: &Invoice) -> Result<u128, InvoiceApiError> {
        let invalid = || InvoiceApiError::InvalidState { id: invoice.id.clone(), status: invoice.status };
        let amount = invoice.token_amount.ok_or_else(invalid)?;
        let chain = invoice.chain.as_deref().unwrap_or_default();
        let token = invoice.token.as_deref().unwrap_or_default();
        self.config.decimals.required_units(chain, token, amount).map_err(|e| {
            error!("👛️ Invoice {} has an unusable token amount. {e}", invoice.id);
            invalid()
        })
    }

    async fn consume(&self, payload: &[u8]) {
        match self.handle_message(payload).await {
            Ok(outcome) => trace!("👛️ Wallet event handled: {outcome:?}"),
            Err(e) if e.is_client_error() => warn!("👛️ Wallet event dropped. {e}"),
            Err(e) => error!("👛️ Wallet event could not be processed. {e}"),
        }
    }

    /// Wraps the matcher in an event [`Handler`] that consumes raw bus payloads.
    pub fn into_handler(self) -> Handler<Vec<u8>> {
        let matcher = Arc::new(self);
        Arc::new(move |payload: Vec<u8>| {
            let matcher = Arc::clone(&matcher);
            Box::pin(async move { matcher.consume(&payload).await }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    /// Consumes the wallet balance topic of `bus` until `shutdown` is triggered.
    ///
    /// Each event is handled in its own task, so a slow transfer for one invoice does not hold up events for other
    /// invoices. Events for the same invoice are kept apart by the in-flight claim and the `PENDING` status check.
    pub async fn run(self, bus: InMemoryBus, shutdown: CancellationToken) {
        let handler = EventHandler::concurrent(self.config.buffer_size, self.into_handler());
        bus.attach(WALLET_BALANCES_TOPIC, handler.subscribe());
        info!("👛️ Wallet event matcher listening on {WALLET_BALANCES_TOPIC}");
        handler.start_handler(shutdown).await;
        info!("👛️ Wallet event matcher stopped");
    }
}

fn same_asset(invoice: &Invoice, event: &WalletBalanceEvent) -> bool {
    let chain = invoice.chain.as_deref().unwrap_or_default();
    let token = invoice.token.as_deref().unwrap_or_default();
    chain.eq_ignore_ascii_case(event.chain.trim()) && token.eq_ignore_ascii_case(event.token.trim())
}
