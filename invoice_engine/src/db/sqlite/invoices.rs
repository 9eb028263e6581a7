use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::traits::{InvoiceQueryFilter, InvoiceStoreError, Pagination},
    db_types::{Invoice, InvoiceId, InvoiceUpdate, NewInvoice},
};

const INVOICE_COLUMNS: &str = "id, client_id, payer_client_id, usd_cents_amount, token_amount, chain, token, address, \
                               gas_limit, status, created_at, updated_at";

/// Inserts a new invoice into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_invoice(invoice: NewInvoice, conn: &mut SqliteConnection) -> Result<Invoice, InvoiceStoreError> {
    let sql = format!(
        "INSERT INTO invoices (id, client_id, usd_cents_amount, status, created_at, updated_at) \
         VALUES (?, ?, ?, 'NEW', ?, ?) RETURNING {INVOICE_COLUMNS}"
    );
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(invoice.id.as_str())
        .bind(invoice.client_id.as_str())
        .bind(invoice.usd_cents_amount.value())
        .bind(invoice.created_at)
        .bind(invoice.created_at)
        .fetch_one(conn)
        .await?;
    trace!("🗃️ Inserted invoice {}", invoice.id);
    Ok(invoice)
}

pub async fn fetch_invoice(id: &InvoiceId, conn: &mut SqliteConnection) -> Result<Option<Invoice>, InvoiceStoreError> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?");
    let invoice = sqlx::query_as::<_, Invoice>(&sql).bind(id.as_str()).fetch_optional(conn).await?;
    Ok(invoice)
}

/// Writes the `Some` fields of `update` and bumps `updated_at`.
///
/// If `expected_status` is set the write only happens when the stored status still matches, which makes status
/// changes compare-and-set operations. When no row is written, the invoice is looked up again to tell a missing
/// invoice apart from a status conflict.
pub async fn update_invoice(update: InvoiceUpdate, conn: &mut SqliteConnection) -> Result<Invoice, InvoiceStoreError> {
    let id = update.id.clone();
    let expected = update.expected_status;
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE invoices SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(payer) = update.payer_client_id {
        builder.push(", payer_client_id = ");
        builder.push_bind(payer.as_str().to_string());
    }
    if let Some(amount) = update.token_amount {
        builder.push(", token_amount = ");
        builder.push_bind(amount);
    }
    if let Some(chain) = update.chain {
        builder.push(", chain = ");
        builder.push_bind(chain);
    }
    if let Some(token) = update.token {
        builder.push(", token = ");
        builder.push_bind(token);
    }
    if let Some(address) = update.address {
        builder.push(", address = ");
        builder.push_bind(address.to_lowercase());
    }
    if let Some(gas_limit) = update.gas_limit {
        builder.push(", gas_limit = ");
        builder.push_bind(gas_limit);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str().to_string());
    if let Some(status) = expected {
        builder.push(" AND status = ");
        builder.push_bind(status.to_string());
    }
    builder.push(format!(" RETURNING {INVOICE_COLUMNS}"));
    trace!("🗃️ Executing query: {}", builder.sql());
    let updated = builder.build_query_as::<Invoice>().fetch_optional(&mut *conn).await?;
    match updated {
        Some(invoice) => {
            debug!("🗃️ Invoice {id} updated. Status is {}", invoice.status);
            Ok(invoice)
        },
        None => match (fetch_invoice(&id, conn).await?, expected) {
            (Some(_), Some(expected)) => Err(InvoiceStoreError::StatusConflict { id, expected }),
            _ => Err(InvoiceStoreError::NotFound(id)),
        },
    }
}

/// Fetches invoices according to the criteria in `filter`.
///
/// Results are ordered newest first. Addresses are compared case-insensitively.
pub async fn fetch_invoices(
    filter: InvoiceQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, InvoiceStoreError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices"));
    let mut conditions = 0;
    if !filter.ids.is_empty() {
        push_in_list(&mut builder, &mut conditions, "id", filter.ids.iter().map(|id| id.as_str().to_string()));
    }
    if !filter.client_ids.is_empty() {
        let ids = filter.client_ids.iter().map(|id| id.as_str().to_string());
        push_in_list(&mut builder, &mut conditions, "client_id", ids);
    }
    if !filter.addresses.is_empty() {
        let addresses = filter.addresses.iter().map(|a| a.to_lowercase());
        push_in_list(&mut builder, &mut conditions, "lower(address)", addresses);
    }
    if !filter.statuses.is_empty() {
        push_in_list(&mut builder, &mut conditions, "status", filter.statuses.iter().map(|s| s.to_string()));
    }
    if let Some(timestamp) = filter.created_before {
        push_conjunction(&mut builder, &mut conditions);
        builder.push("julianday(created_at) < julianday(");
        builder.push_bind(timestamp);
        builder.push(")");
    }
    builder.push(" ORDER BY julianday(created_at) DESC, rowid DESC LIMIT ");
    builder.push_bind(i64::from(pagination.limit));
    builder.push(" OFFSET ");
    builder.push_bind(i64::from(pagination.offset));
    trace!("🗃️ Executing query: {}", builder.sql());
    let invoices = builder.build_query_as::<Invoice>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_invoices: {}", invoices.len());
    Ok(invoices)
}

fn push_conjunction(builder: &mut QueryBuilder<'_, Sqlite>, conditions: &mut usize) {
    builder.push(if *conditions == 0 { " WHERE " } else { " AND " });
    *conditions += 1;
}

fn push_in_list<I>(builder: &mut QueryBuilder<'_, Sqlite>, conditions: &mut usize, column: &str, values: I)
where I: Iterator<Item = String> {
    push_conjunction(builder, conditions);
    builder.push(format!("{column} IN ("));
    let mut list = builder.separated(", ");
    for value in values {
        list.push_bind(value);
    }
    list.push_unseparated(")");
}
