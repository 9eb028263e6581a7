use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::traits::InvoiceStoreError,
    db_types::{Invoice, OutboxRecord},
};

/// Appends a JSON snapshot of `invoice` to the outbox. Call this inside the same transaction as the invoice write.
pub async fn insert_snapshot(invoice: &Invoice, conn: &mut SqliteConnection) -> Result<i64, InvoiceStoreError> {
    let message = serde_json::to_string(invoice)?;
    let id = sqlx::query_scalar::<_, i64>("INSERT INTO invoices_outbox (message) VALUES (?) RETURNING id")
        .bind(message)
        .fetch_one(conn)
        .await?;
    trace!("📬️ Outbox record #{id} created for invoice {}", invoice.id);
    Ok(id)
}

pub async fn fetch_pending(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<OutboxRecord>, InvoiceStoreError> {
    let records = sqlx::query_as::<_, OutboxRecord>("SELECT id, message FROM invoices_outbox ORDER BY id ASC LIMIT ?")
        .bind(i64::from(limit))
        .fetch_all(conn)
        .await?;
    Ok(records)
}

pub async fn delete_records(ids: &[i64], conn: &mut SqliteConnection) -> Result<u64, InvoiceStoreError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM invoices_outbox WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn count(conn: &mut SqliteConnection) -> Result<u64, InvoiceStoreError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices_outbox").fetch_one(conn).await?;
    Ok(u64::try_from(n).unwrap_or_default())
}
