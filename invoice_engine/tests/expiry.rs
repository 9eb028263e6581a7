use std::collections::HashSet;

use chrono::{Duration, Utc};
use invoice_engine::{
    db_types::{InvoiceStatus, InvoiceUpdate, NewInvoice},
    test_utils::prepare_env::fresh_database,
    workers::expiry::{ExpirationSweeper, ExpiryConfig},
    InvoiceManagement,
    OutboxManagement,
    SqliteDatabase,
};
use ipg_common::UsdCents;

async fn invoice_aged(db: &SqliteDatabase, age: Duration, status: InvoiceStatus) -> invoice_engine::db_types::Invoice {
    let new = NewInvoice::new("merchant".into(), UsdCents::from(1000)).with_created_at(Utc::now() - age);
    let invoice = db.insert_invoice(new).await.unwrap();
    let path = [InvoiceStatus::New, InvoiceStatus::Pending, InvoiceStatus::SendingToClient, InvoiceStatus::Success];
    let target = path.iter().position(|s| *s == status).expect("status is not on the happy path");
    for pair in path[..=target].windows(2) {
        db.update_invoice(InvoiceUpdate::transition(invoice.id.clone(), pair[0], pair[1])).await.unwrap();
    }
    db.fetch_invoice(&invoice.id).await.unwrap().unwrap()
}

fn sweeper(db: &SqliteDatabase) -> ExpirationSweeper<SqliteDatabase> {
    let config = ExpiryConfig { expire_after: Duration::minutes(15), ..Default::default() };
    ExpirationSweeper::new(db.clone(), config)
}

#[tokio::test]
async fn stale_unpaid_invoices_expire() {
    let db = fresh_database().await;
    let stale_new = invoice_aged(&db, Duration::minutes(20), InvoiceStatus::New).await;
    let stale_pending = invoice_aged(&db, Duration::hours(3), InvoiceStatus::Pending).await;
    let fresh_new = invoice_aged(&db, Duration::minutes(14), InvoiceStatus::New).await;
    let fresh_pending = invoice_aged(&db, Duration::seconds(1), InvoiceStatus::Pending).await;

    let expired = sweeper(&db).run_once().await.unwrap().into_iter().map(|i| i.id).collect::<HashSet<_>>();
    assert_eq!(expired, HashSet::from([stale_new.id.clone(), stale_pending.id.clone()]));

    for (invoice, status) in [
        (stale_new, InvoiceStatus::Expired),
        (stale_pending, InvoiceStatus::Expired),
        (fresh_new, InvoiceStatus::New),
        (fresh_pending, InvoiceStatus::Pending),
    ] {
        assert_eq!(db.fetch_invoice(&invoice.id).await.unwrap().unwrap().status, status);
    }
    // A second sweep has nothing to do
    assert!(sweeper(&db).run_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn invoices_past_payment_never_expire() {
    let db = fresh_database().await;
    let sending = invoice_aged(&db, Duration::days(2), InvoiceStatus::SendingToClient).await;
    let settled = invoice_aged(&db, Duration::days(2), InvoiceStatus::Success).await;
    assert!(sweeper(&db).run_once().await.unwrap().is_empty());
    assert_eq!(db.fetch_invoice(&sending.id).await.unwrap().unwrap().status, InvoiceStatus::SendingToClient);
    assert_eq!(db.fetch_invoice(&settled.id).await.unwrap().unwrap().status, InvoiceStatus::Success);
}

#[tokio::test]
async fn expiry_is_published() {
    let db = fresh_database().await;
    let invoice = invoice_aged(&db, Duration::hours(1), InvoiceStatus::New).await;
    let before = db.outbox_len().await.unwrap();
    sweeper(&db).run_once().await.unwrap();
    let records = db.fetch_outbox(100).await.unwrap();
    assert_eq!(records.len() as u64, before + 1);
    let snapshot: serde_json::Value = serde_json::from_str(&records.last().unwrap().message).unwrap();
    assert_eq!(snapshot["id"], invoice.id.as_str());
    assert_eq!(snapshot["status"], "EXPIRED");
}

#[tokio::test]
async fn batches_are_bounded() {
    let db = fresh_database().await;
    for _ in 0..5 {
        invoice_aged(&db, Duration::hours(1), InvoiceStatus::New).await;
    }
    let config = ExpiryConfig { batch_size: 2, ..Default::default() };
    let sweeper = ExpirationSweeper::new(db.clone(), config);
    assert_eq!(sweeper.run_once().await.unwrap().len(), 2);
    assert_eq!(sweeper.run_once().await.unwrap().len(), 2);
    assert_eq!(sweeper.run_once().await.unwrap().len(), 1);
    assert!(sweeper.run_once().await.unwrap().is_empty());
}
