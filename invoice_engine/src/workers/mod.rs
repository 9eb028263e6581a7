//! # Background workers
//!
//! Each worker owns its state, exposes a single-pass method (`run_once` or `tick`) that tests can drive
//! deterministically, and a `run` loop that repeats the pass on a fixed interval until its
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is triggered.
//!
//! * [`expiry::ExpirationSweeper`] expires invoices that were never paid.
//! * [`settlement::SettlementWorker`] retries outbound transfers with fee escalation.
//! * [`outbox_publisher::OutboxPublisher`] relays outbox snapshots to the message bus.
//! * [`wallet_matcher::WalletEventMatcher`] matches wallet balance events to pending invoices.
pub mod expiry;
pub mod inflight;
pub mod outbox_publisher;
pub mod settlement;
pub mod wallet_matcher;
