//! # Invoice engine public API
//!
//! The `ipe_api` module exposes the programmatic API for creating and driving invoices.
//!
//! * [`invoice_flow_api`] is the primary API. It creates invoices, prices them and issues deposit addresses, and
//!   offers the operator overrides.
//! * [`invoice_objects`] holds the request and filter types used by the API.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the
//! API, along with the collaborators it calls out to.
//!
//! ```rust,ignore
//! use invoice_engine::{InvoiceFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = InvoiceFlowApi::new(db, custody, prices);
//! let invoice = api.create_invoice(client_id, UsdCents::from(5000)).await?;
//! ```
pub mod errors;
pub mod invoice_flow_api;
pub mod invoice_objects;
