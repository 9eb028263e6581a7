//! Simple stateless pub-sub event handler
//!
//! Components subscribe a [`Handler`] to a stream of events and are fed every event published through any of the
//! [`EventProducer`]s handed out by [`EventHandler::subscribe`]. The handlers have no access to the internal state of
//! the engine. All that is received is the event itself.
//!
//! Handlers are async. They are either run one at a time, in arrival order ([`EventHandler::sequential`]), or each
//! event is handled in its own task ([`EventHandler::concurrent`]).
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Sequential,
    Concurrent,
}

pub struct EventHandler<E: Send + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
    dispatch: Dispatch,
}

impl<E: Send + 'static> EventHandler<E> {
    /// Events are handled one after the other, in the order they were received.
    pub fn sequential(buffer_size: usize, handler: Handler<E>) -> Self {
        Self::new(buffer_size, handler, Dispatch::Sequential)
    }

    /// Every event is handled in its own task.
    pub fn concurrent(buffer_size: usize, handler: Handler<E>) -> Self {
        Self::new(buffer_size, handler, Dispatch::Concurrent)
    }

    fn new(buffer_size: usize, handler: Handler<E>, dispatch: Dispatch) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler, dispatch }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the handler until `shutdown` is triggered, or every producer has been dropped.
    ///
    /// Events that are already being handled when the loop stops are allowed to complete.
    pub async fn start_handler(mut self, shutdown: CancellationToken) {
        debug!("📬️ Starting event handler ({:?})", self.dispatch);
        // drop the internal sender so that when the last subscriber is dropped, we can automatically shut down the
        // handler
        drop(self.sender);
        let mut jobs = JoinSet::new();
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                ev = self.listener.recv() => ev,
            };
            let Some(event) = event else { break };
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            match self.dispatch {
                Dispatch::Sequential => (handler)(event).await,
                Dispatch::Concurrent => {
                    jobs.spawn(async move { (handler)(event).await });
                    // reap whatever has finished so the set doesn't grow without bound
                    while jobs.try_join_next().is_some() {}
                },
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} jobs to complete", jobs.len());
        }
        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                warn!("📬️ An event handler job failed: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Debug, Error)]
#[error("The event channel is closed")]
pub struct EventChannelClosed;

pub struct EventProducer<E: Send> {
    sender: mpsc::Sender<E>,
}

impl<E: Send> Clone for EventProducer<E> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<E: Send> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues `event` for the handler. Waits for buffer space if the handler is lagging.
    pub async fn publish_event(&self, event: E) -> Result<(), EventChannelClosed> {
        self.sender.send(event).await.map_err(|_| EventChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
