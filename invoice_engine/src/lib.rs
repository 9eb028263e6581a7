//! Invoice Engine
//!
//! The invoice engine lets a client request payment of a fixed USD amount in a cryptocurrency of their choice. It
//! watches wallet balance events for funds arriving at the issued deposit address, forwards collected funds to the
//! client and publishes every state change to the rest of the system.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. Every invoice write is paired
//!    with an outbox record in the same transaction, so no state change is ever lost on its way to the message bus.
//! 2. The public API ([`mod@ipe_api`]). This creates invoices, prices them and issues deposit addresses, and offers
//!    the operator overrides.
//! 3. The background workers ([`mod@workers`]): invoice expiry, settlement retries, outbox relaying and wallet event
//!    matching.
//!
//! Wallet custody, price discovery, alerting and the message broker are external. The engine reaches them through the
//! collaborator traits in [`mod@traits`].
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ipe_api;
pub mod traits;
pub mod workers;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    InvoiceManagement,
    InvoiceQueryFilter,
    InvoiceStoreError,
    OutboxManagement,
    Pagination,
};
pub use ipe_api::{
    errors::InvoiceApiError,
    invoice_flow_api::InvoiceFlowApi,
    invoice_objects::{InvoiceListFilter, UpdateInvoiceRequest},
};
