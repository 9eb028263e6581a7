//! # Collaborator contracts
//!
//! The engine does not talk to blockchains, hold keys or discover prices itself. Those concerns live behind the narrow
//! interfaces in this module:
//!
//! * [`CustodyService`] issues deposit addresses and performs outbound transfers.
//! * [`PriceOracle`] quotes spot prices in USD.
//! * [`AlertSink`] notifies operators when automated settlement gives up.
//! * [`MessagePublisher`] hands payloads to the message bus.
mod alerts;
mod custody;
mod errors;
mod message_publisher;
mod price_oracle;

#[cfg(test)]
pub use alerts::MockAlertSink;
pub use alerts::AlertSink;
#[cfg(test)]
pub use custody::MockCustodyService;
pub use custody::CustodyService;
pub use errors::{with_timeout, CollaboratorError};
#[cfg(test)]
pub use message_publisher::MockMessagePublisher;
pub use message_publisher::{MessagePublisher, PublishError};
#[cfg(test)]
pub use price_oracle::MockPriceOracle;
pub use price_oracle::PriceOracle;
