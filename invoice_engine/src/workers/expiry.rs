use std::time::Duration;

use chrono::Utc;
use log::*;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::{InvoiceManagement, InvoiceQueryFilter, InvoiceStoreError, Pagination},
    db_types::{Invoice, InvoiceStatus, InvoiceUpdate},
};

#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    pub tick_interval: Duration,
    /// Invoices still `NEW` or `PENDING` this long after creation are expired.
    pub expire_after: chrono::Duration,
    pub batch_size: u32,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            expire_after: chrono::Duration::minutes(15),
            batch_size: 100,
        }
    }
}

/// Periodically moves unpaid invoices to `EXPIRED`.
pub struct ExpirationSweeper<B> {
    db: B,
    config: ExpiryConfig,
}

impl<B> ExpirationSweeper<B>
where B: InvoiceManagement
{
    pub fn new(db: B, config: ExpiryConfig) -> Self {
        Self { db, config }
    }

    /// Runs a single sweep and returns the invoices that were expired.
    ///
    /// Each candidate is expired with a guard on the status it was observed in, so an invoice that gets paid in the
    /// meantime is left alone. A failure on one invoice does not stop the rest of the batch.
    pub async fn run_once(&self) -> Result<Vec<Invoice>, InvoiceStoreError> {
        let cutoff = Utc::now() - self.config.expire_after;
        let filter = InvoiceQueryFilter::default()
            .with_statuses([InvoiceStatus::New, InvoiceStatus::Pending])
            .created_before(cutoff);
        let candidates = self.db.fetch_invoices(filter, Pagination::first(self.config.batch_size)).await?;
        let mut expired = Vec::with_capacity(candidates.len());
        for invoice in candidates {
            let update = InvoiceUpdate::transition(invoice.id.clone(), invoice.status, InvoiceStatus::Expired);
            match self.db.update_invoice(update).await {
                Ok(invoice) => expired.push(invoice),
                Err(InvoiceStoreError::StatusConflict { id, expected }) => {
                    debug!("🕰️ Invoice {id} left {expected} before it could be expired. Skipping.");
                },
                Err(e) => error!("🕰️ Could not expire invoice {}: {e}", invoice.id),
            }
        }
        Ok(expired)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = tokio::time::interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Invoice expiry worker started. Unpaid invoices expire after {}", self.config.expire_after);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            match self.run_once().await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No invoices to expire"),
                Ok(expired) => {
                    info!("🕰️ {} invoices expired", expired.len());
                    debug!("🕰️ Expired invoices: {}", invoice_list(&expired));
                },
                Err(e) => error!("🕰️ Error running invoice expiry job: {e}"),
            }
        }
        info!("🕰️ Invoice expiry worker stopped");
    }
}

fn invoice_list(invoices: &[Invoice]) -> String {
    invoices.iter().map(|i| format!("[{}] client: {}", i.id, i.client_id)).collect::<Vec<String>>().join(", ")
}
