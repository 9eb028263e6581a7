use actix_web::{http::StatusCode, test::TestRequest};
use invoice_engine::{
    db_types::{InvoiceId, InvoiceStatus},
    test_utils::collaborators::FakeCustody,
};
use serde_json::json;

use super::helpers::TestContext;

#[actix_web::test]
async fn health_check() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_and_fetch_invoice() {
    let ctx = TestContext::new().await;
    let invoice = ctx.new_invoice("merchant", 1999).await;
    assert_eq!(invoice.status, InvoiceStatus::New);
    assert_eq!(invoice.client_id.as_str(), "merchant");
    assert!(invoice.address.is_none());

    let (status, body) = ctx.send_json(TestRequest::get().uri(&format!("/api/invoices/{}", invoice.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], invoice.id.as_str());
    assert_eq!(body["status"], "NEW");
    assert_eq!(body["usd_cents_amount"], 1999);
}

#[actix_web::test]
async fn invoices_must_be_for_a_positive_amount() {
    let ctx = TestContext::new().await;
    let body = json!({ "client_id": "merchant", "usd_cents_amount": 0 });
    let req = TestRequest::post().uri("/api/invoices").set_json(body);
    let (status, body) = ctx.send_json(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));
}

#[actix_web::test]
async fn malformed_create_request() {
    let ctx = TestContext::new().await;
    let req = TestRequest::post().uri("/api/invoices").set_json(json!({ "client_id": "merchant" }));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_and_invalid_invoice_ids() {
    let ctx = TestContext::new().await;
    let (status, _) = ctx.send(TestRequest::get().uri(&format!("/api/invoices/{}", InvoiceId::random()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = ctx.send_json(TestRequest::get().uri("/api/invoices/not-an-invoice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not-an-invoice"));
}

#[actix_web::test]
async fn choosing_a_token_issues_a_deposit_address() {
    let ctx = TestContext::new().await;
    let invoice = ctx.pending_invoice("merchant", 1999).await;
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.chain.as_deref(), Some("ethereum"));
    assert_eq!(invoice.token.as_deref(), Some("USDT"));
    assert_eq!(invoice.address, Some(FakeCustody::address_for(&invoice.id).to_lowercase()));
    let amount = invoice.token_amount.unwrap();
    assert!((amount - 19.99).abs() < 1e-9);
}

#[actix_web::test]
async fn payment_can_only_be_chosen_once() {
    let ctx = TestContext::new().await;
    let invoice = ctx.pending_invoice("merchant", 500).await;
    let req = TestRequest::post()
        .uri(&format!("/api/invoices/{}/payment", invoice.id))
        .set_json(json!({ "chain": "ethereum", "token": "ETH" }));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let stored = ctx.api.check_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.token.as_deref(), Some("USDT"));
}

#[actix_web::test]
async fn unpriced_token_leaves_the_invoice_new() {
    let ctx = TestContext::new().await;
    let invoice = ctx.new_invoice("merchant", 500).await;
    let req = TestRequest::post()
        .uri(&format!("/api/invoices/{}/payment", invoice.id))
        .set_json(json!({ "chain": "ethereum", "token": "DOGE" }));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let stored = ctx.api.check_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.status, InvoiceStatus::New);
    assert!(stored.address.is_none());
}

#[actix_web::test]
async fn payer_is_recorded() {
    let ctx = TestContext::new().await;
    let invoice = ctx.new_invoice("merchant", 500).await;
    let req = TestRequest::post()
        .uri(&format!("/api/invoices/{}/payment", invoice.id))
        .set_json(json!({ "chain": "tron", "token": "USDT", "payer_client_id": "alice" }));
    let (status, body) = ctx.send_json(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payer_client_id"], "alice");
    assert_eq!(body["status"], "PENDING");
}

#[actix_web::test]
async fn operator_status_override() {
    let ctx = TestContext::new().await;
    let invoice = ctx.pending_invoice("merchant", 500).await;
    let uri = format!("/api/invoices/{}/status", invoice.id);
    let (status, body) = ctx.send_json(TestRequest::post().uri(&uri).set_json(json!({ "status": "EXPIRED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "EXPIRED");

    // Expired is final
    let (status, _) = ctx.send(TestRequest::post().uri(&uri).set_json(json!({ "status": "PENDING" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = ctx.send(TestRequest::post().uri(&uri).set_json(json!({ "status": "PAID" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn operator_gas_limit_override() {
    let ctx = TestContext::new().await;
    let invoice = ctx.pending_invoice("merchant", 500).await;
    let uri = format!("/api/invoices/{}/gas-limit", invoice.id);
    let (status, body) = ctx.send_json(TestRequest::post().uri(&uri).set_json(json!({ "gas_limit": 75000 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gas_limit"], 75000);
    assert_eq!(body["status"], "PENDING");

    let (status, _) = ctx.send(TestRequest::post().uri(&uri).set_json(json!({ "gas_limit": -5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = ctx.api.check_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.gas_limit, Some(75000));
}

#[actix_web::test]
async fn search_invoices() {
    let ctx = TestContext::new().await;
    let a = ctx.new_invoice("merchant", 100).await;
    let b = ctx.pending_invoice("merchant", 200).await;
    let _other = ctx.new_invoice("another", 300).await;

    let (status, body) = ctx.send_json(TestRequest::get().uri("/api/invoices?client_id=merchant")).await;
    assert_eq!(status, StatusCode::OK);
    let ids = body.as_array().unwrap().iter().map(|i| i["id"].as_str().unwrap().to_string()).collect::<Vec<_>>();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id.to_string()));
    assert!(ids.contains(&b.id.to_string()));

    let (_, body) = ctx.send_json(TestRequest::get().uri("/api/invoices?client_id=merchant&status=PENDING")).await;
    let invoices = body.as_array().unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["id"], b.id.as_str());

    let (_, body) = ctx.send_json(TestRequest::get().uri("/api/invoices?limit=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = ctx.send(TestRequest::get().uri("/api/invoices?status=LOST")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
