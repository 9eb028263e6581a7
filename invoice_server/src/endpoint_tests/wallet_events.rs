use actix_web::{http::StatusCode, test::TestRequest};
use invoice_engine::events::{WalletBalanceEvent, WALLET_BALANCES_TOPIC};
use serde_json::json;

use super::helpers::TestContext;

fn event_request() -> TestRequest {
    TestRequest::post().uri("/events/wallet-balance").set_json(json!({
        "address": "0xABC",
        "balance": 25_000_000u64,
        "chain": "ethereum",
        "token": "USDT"
    }))
}

#[actix_web::test]
async fn wallet_events_are_queued_for_the_matcher() {
    let ctx = TestContext::new().await;
    let mut events = ctx.bus.subscribe(WALLET_BALANCES_TOPIC, 4);
    let (status, body) = ctx.send_json(event_request()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    let payload = events.recv().await.expect("event was not forwarded");
    let event = WalletBalanceEvent::from_json(&payload).unwrap();
    assert_eq!(event.address, "0xABC");
    assert_eq!(event.balance, 25_000_000);
}

#[actix_web::test]
async fn malformed_wallet_events_are_rejected() {
    let ctx = TestContext::new().await;
    let mut events = ctx.bus.subscribe(WALLET_BALANCES_TOPIC, 4);
    let req = TestRequest::post()
        .uri("/events/wallet-balance")
        .set_json(json!({ "address": "0xABC", "balance": "lots", "chain": "ethereum", "token": "USDT" }));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(events.try_recv().is_err());
}

#[actix_web::test]
async fn wallet_events_need_a_running_matcher() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.send_json(event_request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("matcher"));
}
