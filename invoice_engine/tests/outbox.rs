use std::sync::Arc;

use invoice_engine::{
    db_types::InvoiceStatus,
    events::{InMemoryBus, INVOICES_TOPIC},
    test_utils::{
        collaborators::{FakeCustody, FakePriceOracle, RecordingPublisher},
        prepare_env::fresh_database,
    },
    traits::MessagePublisher,
    workers::outbox_publisher::{OutboxConfig, OutboxPublisher},
    InvoiceFlowApi,
    OutboxManagement,
    SqliteDatabase,
    UpdateInvoiceRequest,
};
use ipg_common::UsdCents;

async fn api() -> InvoiceFlowApi<SqliteDatabase> {
    let db = fresh_database().await;
    let prices = Arc::new(FakePriceOracle::new().with_price("USDT", 1.0));
    InvoiceFlowApi::new(db, Arc::new(FakeCustody::new()), prices)
}

#[tokio::test]
async fn every_write_is_published_in_order() {
    let api = api().await;
    let invoice = api.create_invoice("merchant".into(), UsdCents::from(2500)).await.unwrap();
    api.update_invoice(UpdateInvoiceRequest::new(invoice.id.clone(), "tron", "USDT")).await.unwrap();
    api.update_invoice_status(&invoice.id, InvoiceStatus::Expired).await.unwrap();

    let recorder = Arc::new(RecordingPublisher::new());
    let worker = OutboxPublisher::new(api.db().clone(), recorder.clone(), OutboxConfig::default());
    assert_eq!(worker.run_once().await.unwrap(), 3);
    assert_eq!(api.db().outbox_len().await.unwrap(), 0);

    let payloads = recorder.payloads_on(INVOICES_TOPIC);
    let statuses = payloads.iter().map(|p| p["status"].as_str().unwrap().to_string()).collect::<Vec<_>>();
    assert_eq!(statuses, vec!["NEW", "PENDING", "EXPIRED"]);
    assert!(payloads.iter().all(|p| p["id"] == invoice.id.as_str()));
    assert_eq!(payloads[1]["chain"], "tron");
    assert_eq!(payloads[1]["token_amount"], 25.0);
}

#[tokio::test]
async fn undelivered_records_are_retried() {
    let api = api().await;
    for cents in [100_i64, 200, 300, 400] {
        api.create_invoice("merchant".into(), UsdCents::from(cents)).await.unwrap();
    }
    let recorder = Arc::new(RecordingPublisher::new());
    recorder.succeed_only(Some(1));
    let worker = OutboxPublisher::new(api.db().clone(), recorder.clone(), OutboxConfig::default());
    assert_eq!(worker.run_once().await.unwrap(), 1);
    assert_eq!(api.db().outbox_len().await.unwrap(), 3);

    recorder.succeed_only(None);
    assert_eq!(worker.run_once().await.unwrap(), 3);
    let amounts = recorder
        .payloads_on(INVOICES_TOPIC)
        .iter()
        .map(|p| p["usd_cents_amount"].as_i64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(amounts, vec![100, 200, 300, 400]);
}

#[tokio::test]
async fn crash_before_delete_republishes() {
    let api = api().await;
    api.create_invoice("merchant".into(), UsdCents::from(100)).await.unwrap();
    // Simulate a crash between publish and delete: the record reaches the bus, but stays in the outbox
    let record = api.db().fetch_outbox(1).await.unwrap().pop().unwrap();
    let recorder = Arc::new(RecordingPublisher::new());
    recorder.publish(INVOICES_TOPIC, record.message.as_bytes()).await.unwrap();

    let worker = OutboxPublisher::new(api.db().clone(), recorder.clone(), OutboxConfig::default());
    assert_eq!(worker.run_once().await.unwrap(), 1);
    let payloads = recorder.payloads_on(INVOICES_TOPIC);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
    assert_eq!(api.db().outbox_len().await.unwrap(), 0);
}

#[tokio::test]
async fn unrouted_topics_keep_records() {
    let api = api().await;
    api.create_invoice("merchant".into(), UsdCents::from(100)).await.unwrap();
    let bus = InMemoryBus::new();
    let worker = OutboxPublisher::new(api.db().clone(), Arc::new(bus.clone()), OutboxConfig::default());
    assert_eq!(worker.run_once().await.unwrap(), 0);
    assert_eq!(api.db().outbox_len().await.unwrap(), 1);

    let mut receiver = bus.subscribe(INVOICES_TOPIC, 8);
    assert_eq!(worker.run_once().await.unwrap(), 1);
    let payload = receiver.recv().await.unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(snapshot["status"], "NEW");
}
