use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{ClientId, InvoiceId, InvoiceStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Store-level invoice filter. Every field is optional and combinable with the others. An empty list or `None` means
/// "no constraint".
#[derive(Debug, Clone, Default)]
pub struct InvoiceQueryFilter {
    pub ids: Vec<InvoiceId>,
    pub client_ids: Vec<ClientId>,
    /// Matched case-insensitively
    pub addresses: Vec<String>,
    pub statuses: Vec<InvoiceStatus>,
    pub created_before: Option<DateTime<Utc>>,
}

impl InvoiceQueryFilter {
    pub fn with_id(mut self, id: InvoiceId) -> Self {
        self.ids.push(id);
        self
    }

    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_ids.push(client_id);
        self
    }

    pub fn with_address<S: AsRef<str>>(mut self, address: S) -> Self {
        self.addresses.push(address.as_ref().to_lowercase());
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_statuses<I: IntoIterator<Item = InvoiceStatus>>(mut self, statuses: I) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn created_before(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_before = Some(timestamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() &&
            self.client_ids.is_empty() &&
            self.addresses.is_empty() &&
            self.statuses.is_empty() &&
            self.created_before.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_SIZE, offset: 0 }
    }
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub fn first(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }
}
