//! Start-up and shutdown of the engine's background workers.
use std::{future::Future, pin::Pin, sync::Arc};

use invoice_engine::{
    events::{EventHandler, Handler, InMemoryBus, INVOICES_TOPIC},
    traits::{AlertSink, CustodyService, MessagePublisher},
    workers::{
        expiry::ExpirationSweeper,
        inflight::InFlightTracker,
        outbox_publisher::OutboxPublisher,
        settlement::SettlementWorker,
        wallet_matcher::WalletEventMatcher,
    },
    SqliteDatabase,
};
use log::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// The running background workers. They all stop when [`Self::shutdown`] is called.
pub struct Workers {
    shutdown: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Workers {
    pub fn new() -> Self {
        Self { shutdown: CancellationToken::new(), handles: Vec::new() }
    }

    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn add(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals every worker to stop and waits until they have.
    pub async fn shutdown(self) {
        info!("⚙️ Stopping {} background workers", self.handles.len());
        self.shutdown.cancel();
        for (name, handle) in self.handles {
            match handle.await {
                Ok(()) => debug!("⚙️ {name} stopped"),
                Err(e) => error!("⚙️ {name} did not stop cleanly. {e}"),
            }
        }
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Collaborators {
    pub custody: Arc<dyn CustodyService>,
    pub alerts: Option<Arc<dyn AlertSink>>,
    pub publisher: Arc<dyn MessagePublisher>,
}

/// Starts the expiry sweeper, the settlement worker, the outbox publisher and the wallet event matcher.
///
/// Wallet events are read from `bus`. If the outbound publisher is the bus itself, a logging consumer is attached to
/// the invoice topic so that outbox records have somewhere to go.
pub fn start_workers(
    config: &ServerConfig,
    db: SqliteDatabase,
    bus: InMemoryBus,
    collaborators: Collaborators,
    tracker: Arc<dyn InFlightTracker>,
    publish_locally: bool,
) -> Workers {
    let mut workers = Workers::new();
    let token = workers.token();
    let Collaborators { custody, alerts, publisher } = collaborators;

    let sweeper = ExpirationSweeper::new(db.clone(), config.expiry_config());
    workers.add("Expiry sweeper", tokio::spawn(sweeper.run(token.clone())));

    let mut settlement =
        SettlementWorker::new(db.clone(), custody.clone(), tracker.clone(), config.settlement_config());
    if let Some(alerts) = alerts {
        settlement = settlement.with_alerts(alerts);
    }
    workers.add("Settlement worker", tokio::spawn(settlement.run(token.clone())));

    let matcher = WalletEventMatcher::new(db.clone(), custody, tracker, config.matcher_config());
    workers.add("Wallet event matcher", tokio::spawn(matcher.run(bus.clone(), token.clone())));

    if publish_locally {
        workers.add("Local event log", start_local_event_log(&bus, token.clone()));
    }
    let outbox = OutboxPublisher::new(db, publisher, config.outbox_config());
    workers.add("Outbox publisher", tokio::spawn(outbox.run(token)));
    info!("⚙️ {} background workers started", workers.len());
    workers
}

/// Consumes the invoice topic of the in-process bus and logs every event.
pub fn start_local_event_log(bus: &InMemoryBus, shutdown: CancellationToken) -> JoinHandle<()> {
    let handler: Handler<Vec<u8>> = Arc::new(|payload: Vec<u8>| {
        Box::pin(async move {
            info!("📣️ Invoice event: {}", String::from_utf8_lossy(&payload));
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handler = EventHandler::concurrent(256, handler);
    bus.attach(INVOICES_TOPIC, handler.subscribe());
    tokio::spawn(handler.start_handler(shutdown))
}
