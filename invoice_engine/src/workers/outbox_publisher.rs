use std::{sync::Arc, time::Duration};

use log::*;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::{InvoiceStoreError, OutboxManagement},
    events::INVOICES_TOPIC,
    traits::{MessagePublisher, PublishError},
};

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub tick_interval: Duration,
    pub batch_size: u32,
    pub topic: String,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_millis(500), batch_size: 100, topic: INVOICES_TOPIC.to_string() }
    }
}

/// Relays outbox records to the message bus.
///
/// Delivery is at-least-once. A record is only deleted after the bus has acknowledged it, so a crash (or a failed
/// delete) between the two steps results in the record being published again on a later tick.
pub struct OutboxPublisher<B> {
    db: B,
    publisher: Arc<dyn MessagePublisher>,
    config: OutboxConfig,
}

impl<B> OutboxPublisher<B>
where B: OutboxManagement
{
    pub fn new(db: B, publisher: Arc<dyn MessagePublisher>, config: OutboxConfig) -> Self {
        Self { db, publisher, config }
    }

    /// Publishes one batch of records, oldest first, and deletes the ones that were delivered. Returns the number of
    /// records delivered.
    ///
    /// The batch stops at the first transient failure (bus unavailable, or nobody listening). Records delivered before
    /// it are still deleted. A record the bus rejects outright will never be accepted, so it is logged in full and
    /// discarded, and the batch carries on.
    pub async fn run_once(&self) -> Result<usize, InvoiceStoreError> {
        let records = self.db.fetch_outbox(self.config.batch_size).await?;
        if records.is_empty() {
            return Ok(0);
        }
        let mut delivered = Vec::with_capacity(records.len());
        let mut discarded = Vec::new();
        for record in &records {
            match self.publisher.publish(&self.config.topic, record.message.as_bytes()).await {
                Ok(()) => delivered.push(record.id),
                Err(PublishError::Rejected(reason)) => {
                    error!("📬️ Outbox record #{} was rejected by the bus and is discarded. {reason}", record.id);
                    error!("📬️ Discarded payload: {}", record.message);
                    discarded.push(record.id);
                },
                Err(e) => {
                    warn!("📬️ Could not publish outbox record #{}. {e}. Will retry on the next tick.", record.id);
                    break;
                },
            }
        }
        let done = [delivered.as_slice(), discarded.as_slice()].concat();
        if !done.is_empty() {
            let deleted = self.db.delete_outbox(&done).await?;
            trace!("📬️ {deleted} outbox records cleared");
        }
        debug!("📬️ {}/{} outbox records published to {}", delivered.len(), records.len(), self.config.topic);
        Ok(delivered.len())
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = tokio::time::interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("📬️ Outbox publisher started on topic {}", self.config.topic);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            if let Err(e) = self.run_once().await {
                error!("📬️ Outbox publishing failed: {e}");
            }
        }
        info!("📬️ Outbox publisher stopped");
    }
}
