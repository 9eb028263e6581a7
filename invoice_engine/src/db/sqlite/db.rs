use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, invoices, new_pool, outbox};
use crate::{
    db::traits::{InvoiceManagement, InvoiceQueryFilter, InvoiceStoreError, OutboxManagement, Pagination},
    db_types::{Invoice, InvoiceId, InvoiceUpdate, NewInvoice, OutboxRecord},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `IPG_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, InvoiceStoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, InvoiceStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), InvoiceStoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| InvoiceStoreError::DriverError(e.into()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl InvoiceManagement for SqliteDatabase {
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, InvoiceStoreError> {
        let mut tx = self.pool.begin().await?;
        let invoice = invoices::insert_invoice(invoice, &mut tx).await?;
        outbox::insert_snapshot(&invoice, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Invoice {} for {} saved for client {}", invoice.id, invoice.usd_cents_amount, invoice.client_id);
        Ok(invoice)
    }

    async fn update_invoice(&self, update: InvoiceUpdate) -> Result<Invoice, InvoiceStoreError> {
        if update.is_empty() {
            debug!("🗃️ No fields to update for invoice {}. Update request skipped.", update.id);
            let invoice = self.fetch_invoice(&update.id).await?.ok_or(InvoiceStoreError::NotFound(update.id))?;
            return Ok(invoice);
        }
        let mut tx = self.pool.begin().await?;
        let invoice = invoices::update_invoice(update, &mut tx).await?;
        outbox::insert_snapshot(&invoice, &mut tx).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    async fn fetch_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, InvoiceStoreError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoice(id, &mut conn).await
    }

    async fn fetch_invoices(
        &self,
        filter: InvoiceQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<Invoice>, InvoiceStoreError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoices(filter, pagination, &mut conn).await
    }
}

impl OutboxManagement for SqliteDatabase {
    async fn fetch_outbox(&self, limit: u32) -> Result<Vec<OutboxRecord>, InvoiceStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_pending(limit, &mut conn).await
    }

    async fn delete_outbox(&self, ids: &[i64]) -> Result<u64, InvoiceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = outbox::delete_records(ids, &mut conn).await?;
        trace!("📬️ {deleted} outbox records removed");
        Ok(deleted)
    }

    async fn outbox_len(&self) -> Result<u64, InvoiceStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::count(&mut conn).await
    }
}
