//! In-memory stand-ins for the engine's collaborators, with enough instrumentation to assert on how they were used.
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    db_types::{ClientId, InvoiceId},
    traits::{AlertSink, CollaboratorError, CustodyService, MessagePublisher, PriceOracle, PublishError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    pub client_id: ClientId,
    pub invoice_id: InvoiceId,
    pub gas_limit: Option<i64>,
}

/// A custody service that issues deterministic (mixed-case) addresses and records every transfer.
#[derive(Default)]
pub struct FakeCustody {
    failures_remaining: AtomicU32,
    always_fail: AtomicBool,
    transfer_delay: Mutex<Duration>,
    transfers: Mutex<Vec<TransferCall>>,
    cancelled: Mutex<Vec<InvoiceId>>,
    in_flight: Mutex<HashSet<InvoiceId>>,
    overlaps: AtomicUsize,
}

impl FakeCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// The address [`CustodyService::accept_crypto`] hands out for `invoice_id`.
    pub fn address_for(invoice_id: &InvoiceId) -> String {
        format!("0x{}", invoice_id.as_str().replace('-', "").to_uppercase())
    }

    /// The next `n` transfers fail.
    pub fn fail_next_transfers(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn fail_all_transfers(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_transfer_delay(&self, delay: Duration) {
        *self.transfer_delay.lock().unwrap() = delay;
    }

    /// Every transfer attempt, successful or not, in call order.
    pub fn transfers(&self) -> Vec<TransferCall> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn transfers_for(&self, invoice_id: &InvoiceId) -> Vec<TransferCall> {
        self.transfers().into_iter().filter(|t| &t.invoice_id == invoice_id).collect()
    }

    pub fn cancelled(&self) -> Vec<InvoiceId> {
        self.cancelled.lock().unwrap().clone()
    }

    /// How many times a transfer started for an invoice that already had a transfer running.
    pub fn overlapping_transfers(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustodyService for FakeCustody {
    async fn accept_crypto(
        &self,
        invoice_id: &InvoiceId,
        _chain: &str,
        _token: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(Self::address_for(invoice_id))
    }

    async fn cancel_accepting_crypto(&self, invoice_id: &InvoiceId) -> Result<(), CollaboratorError> {
        self.cancelled.lock().unwrap().push(invoice_id.clone());
        Ok(())
    }

    async fn transfer(
        &self,
        client_id: &ClientId,
        invoice_id: &InvoiceId,
        gas_limit: Option<i64>,
    ) -> Result<String, CollaboratorError> {
        if !self.in_flight.lock().unwrap().insert(invoice_id.clone()) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.transfers.lock().unwrap().push(TransferCall {
            client_id: client_id.clone(),
            invoice_id: invoice_id.clone(),
            gas_limit,
        });
        let delay = *self.transfer_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.lock().unwrap().remove(invoice_id);
        let scheduled_failure =
            self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if scheduled_failure || self.always_fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected(format!("transfer for {invoice_id} bounced")));
        }
        Ok(format!("tx-{invoice_id}-{}", self.transfers_for(invoice_id).len()))
    }
}

/// Quotes fixed prices. Unknown symbols are rejected.
#[derive(Default)]
pub struct FakePriceOracle {
    prices: Mutex<HashMap<String, f64>>,
}

impl FakePriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, symbol: &str, price: f64) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_uppercase(), price);
    }
}

#[async_trait]
impl PriceOracle for FakePriceOracle {
    async fn get_price(&self, symbol: &str) -> Result<f64, CollaboratorError> {
        self.prices
            .lock()
            .unwrap()
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| CollaboratorError::Rejected(format!("no price for {symbol}")))
    }
}

#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<String>>,
}

impl RecordingAlertSink {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send_alert(&self, message: &str) -> Result<(), CollaboratorError> {
        self.alerts.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Records published messages. Can be told to start failing after a number of successful publishes.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    succeed_count: Mutex<Option<usize>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the next `n` publishes succeed. `None` lifts the restriction.
    pub fn succeed_only(&self, n: Option<usize>) {
        *self.succeed_count.lock().unwrap() = n;
    }

    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn payloads_on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.messages()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| serde_json::from_slice(&p).expect("payload is not JSON"))
            .collect()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        {
            let mut budget = self.succeed_count.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(PublishError::Unavailable("broker offline".into())),
                Some(n) => *n -= 1,
                None => {},
            }
        }
        self.messages.lock().unwrap().push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}
