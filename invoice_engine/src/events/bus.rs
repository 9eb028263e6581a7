//! An in-process message bus.
//!
//! Topics are routed to [`EventProducer`]s, so any [`super::EventHandler`] can consume a topic. It stands in for the
//! external broker when the engine runs in a single process, and in tests.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use log::*;
use tokio::sync::mpsc;

use super::EventProducer;
use crate::traits::{MessagePublisher, PublishError};

#[derive(Clone, Default)]
pub struct InMemoryBus {
    routes: Arc<RwLock<HashMap<String, Vec<EventProducer<Vec<u8>>>>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every payload published on `topic` to `producer`.
    pub fn attach(&self, topic: &str, producer: EventProducer<Vec<u8>>) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        routes.entry(topic.to_string()).or_default().push(producer);
        debug!("🚌️ New subscriber attached to topic {topic}");
    }

    /// Convenience subscription that hands back the raw receiving end of the topic.
    pub fn subscribe(&self, topic: &str, buffer_size: usize) -> mpsc::Receiver<Vec<u8>> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        self.attach(topic, EventProducer::new(sender));
        receiver
    }

    fn producers_for(&self, topic: &str) -> Vec<EventProducer<Vec<u8>>> {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        match routes.get_mut(topic) {
            Some(producers) => {
                producers.retain(|p| !p.is_closed());
                producers.clone()
            },
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let producers = self.producers_for(topic);
        if producers.is_empty() {
            return Err(PublishError::NoRoute(topic.to_string()));
        }
        for producer in producers {
            producer.publish_event(payload.to_vec()).await.map_err(|e| PublishError::Rejected(e.to_string()))?;
        }
        trace!("🚌️ Delivered {} bytes on {topic}", payload.len());
        Ok(())
    }
}
