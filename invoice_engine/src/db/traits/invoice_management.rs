use std::future::Future;

use super::{InvoiceQueryFilter, InvoiceStoreError, Pagination};
use crate::db_types::{Invoice, InvoiceId, InvoiceUpdate, NewInvoice};

/// Transactional persistence of invoices.
///
/// Implementations MUST write an outbox snapshot of the resulting invoice in the same transaction as every insert and
/// update (see [`super::OutboxManagement`]).
pub trait InvoiceManagement: Clone + Send + Sync + 'static {
    /// Stores a brand-new invoice and returns the row as persisted.
    ///
    /// Returns [`InvoiceStoreError::AlreadyExists`] if the id is taken.
    fn insert_invoice(&self, invoice: NewInvoice) -> impl Future<Output = Result<Invoice, InvoiceStoreError>> + Send;

    /// Applies the `Some` fields of `update` and returns the updated row.
    ///
    /// * [`InvoiceStoreError::NotFound`] if there is no such invoice.
    /// * [`InvoiceStoreError::StatusConflict`] if `update.expected_status` is set and no longer matches.
    /// * [`InvoiceStoreError::AlreadyExists`] if the new deposit address is already assigned to another invoice.
    ///
    /// An update with no fields set is a no-op that simply returns the current row.
    fn update_invoice(&self, update: InvoiceUpdate) -> impl Future<Output = Result<Invoice, InvoiceStoreError>> + Send;

    fn fetch_invoice(&self, id: &InvoiceId) -> impl Future<Output = Result<Option<Invoice>, InvoiceStoreError>> + Send;

    /// Returns the invoices matching `filter`, newest first.
    fn fetch_invoices(
        &self,
        filter: InvoiceQueryFilter,
        pagination: Pagination,
    ) -> impl Future<Output = Result<Vec<Invoice>, InvoiceStoreError>> + Send;
}
