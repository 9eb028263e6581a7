mod bus;
mod channel;
mod event_types;

pub use bus::InMemoryBus;
pub use channel::{EventChannelClosed, EventHandler, EventProducer, Handler};
pub use event_types::*;
