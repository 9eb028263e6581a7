use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::{InvoiceManagement, InvoiceQueryFilter, InvoiceStoreError, Pagination},
    db_types::{Invoice, InvoiceStatus, InvoiceUpdate},
    traits::{with_timeout, AlertSink, CustodyService},
    workers::inflight::{InFlightClaim, InFlightTracker},
};

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub tick_interval: Duration,
    pub batch_size: u32,
    /// Transfer tries per settlement attempt before the invoice is handed over to an operator
    pub max_attempts: u32,
    pub gas_limit_base: i64,
    pub gas_limit_step: i64,
    /// Pause between consecutive tries of the same attempt
    pub retry_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 10,
            gas_limit_base: 50_000,
            gas_limit_step: 50_000,
            retry_backoff: Duration::ZERO,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl SettlementConfig {
    /// The fee ceiling for try number `try_index` (zero-based). An operator override always wins. Otherwise the
    /// ceiling grows linearly with every failed try.
    pub fn gas_limit_for(&self, operator_override: Option<i64>, try_index: u32) -> i64 {
        operator_override.unwrap_or_else(|| {
            self.gas_limit_base.saturating_add(self.gas_limit_step.saturating_mul(i64::from(try_index)))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { tx_hash: String, attempts: u32 },
    /// Every try failed and the invoice is now under manual control.
    Exhausted { attempts: u32 },
    /// The invoice was no longer awaiting settlement by the time it was claimed.
    Skipped,
    /// The result could not be recorded. The invoice keeps its status and will be picked up again.
    Deferred { attempts: u32 },
}

/// The slow settlement path. Retries outbound transfers for every invoice stuck in `SENDING_TO_CLIENT`.
pub struct SettlementWorker<B> {
    db: B,
    custody: Arc<dyn CustodyService>,
    alerts: Option<Arc<dyn AlertSink>>,
    tracker: Arc<dyn InFlightTracker>,
    config: SettlementConfig,
}

impl<B: Clone> Clone for SettlementWorker<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            custody: Arc::clone(&self.custody),
            alerts: self.alerts.clone(),
            tracker: Arc::clone(&self.tracker),
            config: self.config.clone(),
        }
    }
}

impl<B> SettlementWorker<B>
where B: InvoiceManagement
{
    pub fn new(
        db: B,
        custody: Arc<dyn CustodyService>,
        tracker: Arc<dyn InFlightTracker>,
        config: SettlementConfig,
    ) -> Self {
        Self { db, custody, alerts: None, tracker, config }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Spawns a settlement attempt for every invoice awaiting settlement that is not already being settled.
    ///
    /// Returns the handles of the spawned attempts. The attempts run independently of the caller.
    pub async fn tick(&self) -> Result<Vec<JoinHandle<SettlementOutcome>>, InvoiceStoreError> {
        let filter = InvoiceQueryFilter::default().with_status(InvoiceStatus::SendingToClient);
        let invoices = self.db.fetch_invoices(filter, Pagination::first(self.config.batch_size)).await?;
        let mut handles = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let Some(claim) = InFlightClaim::acquire(&self.tracker, &invoice.id) else {
                trace!("💸️ Invoice {} is already being settled", invoice.id);
                continue;
            };
            let worker = self.clone();
            handles.push(tokio::spawn(async move { worker.settle(claim).await }));
        }
        Ok(handles)
    }

    /// Runs a full settlement attempt for the claimed invoice: up to `max_attempts` transfer tries with an escalating
    /// fee ceiling.
    pub async fn settle(&self, claim: InFlightClaim) -> SettlementOutcome {
        let id = claim.invoice_id().clone();
        // Re-read under the claim. A previous attempt may have finished between the batch fetch and the claim.
        let invoice = match self.db.fetch_invoice(&id).await {
            Ok(Some(invoice)) if invoice.status == InvoiceStatus::SendingToClient => invoice,
            Ok(_) => return SettlementOutcome::Skipped,
            Err(e) => {
                error!("💸️ Could not load invoice {id} for settlement: {e}");
                return SettlementOutcome::Deferred { attempts: 0 };
            },
        };
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();
        for try_index in 0..max_attempts {
            if try_index > 0 && !self.config.retry_backoff.is_zero() {
                tokio::time::sleep(self.config.retry_backoff).await;
            }
            let attempt = try_index + 1;
            let gas_limit = self.config.gas_limit_for(invoice.gas_limit, try_index);
            let transfer = self.custody.transfer(&invoice.client_id, &invoice.id, Some(gas_limit));
            match with_timeout(self.config.call_timeout, transfer).await {
                Ok(tx_hash) => return self.record_success(&invoice, tx_hash, attempt).await,
                Err(e) => {
                    warn!("💸️ Transfer {attempt}/{max_attempts} for invoice {id} failed (gas limit {gas_limit}). {e}");
                    last_error = e.to_string();
                },
            }
        }
        self.hand_over(&invoice, max_attempts, &last_error).await
    }

    async fn record_success(&self, invoice: &Invoice, tx_hash: String, attempts: u32) -> SettlementOutcome {
        let update =
            InvoiceUpdate::transition(invoice.id.clone(), InvoiceStatus::SendingToClient, InvoiceStatus::Success);
        match self.db.update_invoice(update).await {
            Ok(_) => {
                info!("💸️ Invoice {} settled in {attempts} tries. Transaction {tx_hash}", invoice.id);
                SettlementOutcome::Settled { tx_hash, attempts }
            },
            Err(e) => {
                error!("💸️ Transfer {tx_hash} for invoice {} succeeded but could not be recorded. {e}", invoice.id);
                SettlementOutcome::Deferred { attempts }
            },
        }
    }

    async fn hand_over(&self, invoice: &Invoice, attempts: u32, last_error: &str) -> SettlementOutcome {
        let update =
            InvoiceUpdate::transition(invoice.id.clone(), InvoiceStatus::SendingToClient, InvoiceStatus::ManualControl);
        if let Err(e) = self.db.update_invoice(update).await {
            error!("💸️ Could not move invoice {} to manual control. {e}", invoice.id);
            return SettlementOutcome::Deferred { attempts };
        }
        error!("💸️ Invoice {} could not be settled after {attempts} tries. It needs manual attention.", invoice.id);
        if let Some(alerts) = &self.alerts {
            let message = format!(
                "Invoice {} for client {} ({}) moved to MANUAL_CONTROL after {attempts} failed transfers. Last error: \
                 {last_error}",
                invoice.id, invoice.client_id, invoice.usd_cents_amount
            );
            if let Err(e) = with_timeout(self.config.call_timeout, alerts.send_alert(&message)).await {
                warn!("💸️ Could not raise an alert for invoice {}. {e}", invoice.id);
            }
        }
        SettlementOutcome::Exhausted { attempts }
    }

    /// Ticks until `shutdown` is triggered. Attempts still running at that point are awaited before returning.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = tokio::time::interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("💸️ Settlement worker started");
        let mut attempts: Vec<JoinHandle<SettlementOutcome>> = Vec::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            attempts.retain(|h| !h.is_finished());
            match self.tick().await {
                Ok(handles) => {
                    if !handles.is_empty() {
                        debug!("💸️ {} settlement attempts started", handles.len());
                    }
                    attempts.extend(handles);
                },
                Err(e) => error!("💸️ Could not fetch invoices awaiting settlement: {e}"),
            }
        }
        if !attempts.is_empty() {
            info!("💸️ Waiting for {} settlement attempts to complete", attempts.len());
        }
        for handle in attempts {
            if let Err(e) = handle.await {
                error!("💸️ A settlement attempt aborted: {e}");
            }
        }
        info!("💸️ Settlement worker stopped");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fee_escalation() {
        let config = SettlementConfig::default();
        assert_eq!(config.gas_limit_for(None, 0), 50_000);
        assert_eq!(config.gas_limit_for(None, 1), 100_000);
        assert_eq!(config.gas_limit_for(None, 9), 500_000);
        assert_eq!(config.gas_limit_for(Some(21_000), 0), 21_000);
        assert_eq!(config.gas_limit_for(Some(21_000), 7), 21_000);
        let config = SettlementConfig { gas_limit_base: i64::MAX - 1, ..Default::default() };
        assert_eq!(config.gas_limit_for(None, 3), i64::MAX);
    }
}
