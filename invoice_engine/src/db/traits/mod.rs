//! #  Invoice store contracts.
//!
//! This module provides the interface contracts that invoice store *backends* have to fulfil.
//!
//! ## Invoices and the outbox
//! Every write to an invoice is paired with a JSON snapshot of the written row in an outbox table. The two writes are
//! committed in the same transaction, so a crash after the commit can never lose the corresponding event. The
//! snapshots are picked up by the outbox publisher and relayed to the message bus.
//!
//! ## Traits
//! * [`InvoiceManagement`] defines the behaviour for creating, updating and querying invoices.
//! * [`OutboxManagement`] defines the behaviour for draining the outbox.
mod data_objects;
mod errors;
mod invoice_management;
mod outbox_management;

pub use data_objects::{InvoiceQueryFilter, Pagination};
pub use errors::InvoiceStoreError;
pub use invoice_management::InvoiceManagement;
pub use outbox_management::OutboxManagement;
