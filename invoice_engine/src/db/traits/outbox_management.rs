use std::future::Future;

use super::InvoiceStoreError;
use crate::db_types::OutboxRecord;

pub trait OutboxManagement: Clone + Send + Sync + 'static {
    /// Fetches up to `limit` pending outbox records, oldest first.
    fn fetch_outbox(&self, limit: u32) -> impl Future<Output = Result<Vec<OutboxRecord>, InvoiceStoreError>> + Send;

    /// Removes the given records from the outbox. Returns the number of rows deleted. Unknown ids are ignored.
    fn delete_outbox(&self, ids: &[i64]) -> impl Future<Output = Result<u64, InvoiceStoreError>> + Send;

    /// The number of records still waiting to be published.
    fn outbox_len(&self) -> impl Future<Output = Result<u64, InvoiceStoreError>> + Send;
}
