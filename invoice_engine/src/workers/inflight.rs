//! Tracks which invoices currently have a settlement attempt running.
//!
//! Both the fast path ([`super::wallet_matcher`]) and the slow path ([`super::settlement`]) claim an invoice before
//! transferring funds for it, so at most one transfer per invoice is ever in progress. [`LocalInFlightTracker`] only
//! coordinates within one process. Running several instances requires a tracker backed by a shared lease.
use std::{
    collections::HashSet,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use crate::db_types::InvoiceId;

pub trait InFlightTracker: Send + Sync {
    /// Claims `id`. Returns false if it is already claimed.
    fn try_claim(&self, id: &InvoiceId) -> bool;

    fn release(&self, id: &InvoiceId);

    fn in_flight(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct LocalInFlightTracker {
    claimed: Mutex<HashSet<InvoiceId>>,
}

impl LocalInFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InFlightTracker for LocalInFlightTracker {
    fn try_claim(&self, id: &InvoiceId) -> bool {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner()).insert(id.clone())
    }

    fn release(&self, id: &InvoiceId) {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
    }

    fn in_flight(&self) -> usize {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Holds a claim on an invoice. The claim is released when the guard is dropped, whichever way the attempt ends.
pub struct InFlightClaim {
    id: InvoiceId,
    tracker: Arc<dyn InFlightTracker>,
}

impl InFlightClaim {
    pub fn acquire(tracker: &Arc<dyn InFlightTracker>, id: &InvoiceId) -> Option<Self> {
        tracker.try_claim(id).then(|| Self { id: id.clone(), tracker: Arc::clone(tracker) })
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.id
    }
}

impl Debug for InFlightClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InFlightClaim({})", self.id)
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.tracker.release(&self.id);
    }
}
