//! # Invoice payment gateway server
//! This crate hosts the engine as a long-running service. It is responsible for:
//! * Exposing the invoice API over HTTP.
//! * Accepting wallet balance events and handing them to the wallet event matcher.
//! * Running the background workers: expiry, settlement, outbox relaying and event matching.
//! * Talking to the custody service, the price oracle, the alert sink and the message bus over REST.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `GET /health`: Returns 200 OK.
//! * `POST /events/wallet-balance`: Queues a wallet balance event for matching.
//! * `POST /api/invoices`: Creates an invoice.
//! * `GET /api/invoices`: Lists invoices, filtered by client and status.
//! * `GET /api/invoices/{id}`: Fetches an invoice.
//! * `POST /api/invoices/{id}/payment`: Picks the chain and token and issues the deposit address.
//! * `POST /api/invoices/{id}/status`: Operator status override.
//! * `POST /api/invoices/{id}/gas-limit`: Operator gas limit override.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
