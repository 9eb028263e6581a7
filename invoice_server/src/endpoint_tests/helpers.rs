use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use invoice_engine::{
    db_types::Invoice,
    events::InMemoryBus,
    test_utils::{
        collaborators::{FakeCustody, FakePriceOracle},
        prepare_env::fresh_database,
    },
    InvoiceFlowApi,
    SqliteDatabase,
};
use log::debug;
use serde_json::json;

use crate::server::configure_routes;

/// Everything a request handler can reach, backed by a fresh database and fake collaborators.
pub struct TestContext {
    pub custody: Arc<FakeCustody>,
    pub api: web::Data<InvoiceFlowApi<SqliteDatabase>>,
    pub bus: web::Data<InMemoryBus>,
}

impl TestContext {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let db = fresh_database().await;
        let custody = Arc::new(FakeCustody::new());
        let prices = Arc::new(FakePriceOracle::new().with_price("USDT", 1.0).with_price("ETH", 2500.0));
        let api = InvoiceFlowApi::new(db, custody.clone(), prices);
        Self { custody, api: web::Data::new(api), bus: web::Data::new(InMemoryBus::new()) }
    }

    pub async fn send(&self, req: TestRequest) -> (StatusCode, String) {
        let app = App::new().app_data(self.api.clone()).app_data(self.bus.clone()).configure(configure_routes);
        let service = test::init_service(app).await;
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
        debug!("Response {status}: {body}");
        (status, body)
    }

    pub async fn send_json(&self, req: TestRequest) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.send(req).await;
        let value = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"));
        (status, value)
    }

    /// Creates an invoice through the API and returns it.
    pub async fn new_invoice(&self, client_id: &str, cents: i64) -> Invoice {
        let req = TestRequest::post()
            .uri("/api/invoices")
            .set_json(json!({ "client_id": client_id, "usd_cents_amount": cents }));
        let (status, body) = self.send(req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        serde_json::from_str(&body).unwrap()
    }

    /// Creates an invoice and chooses USDT on ethereum for it.
    pub async fn pending_invoice(&self, client_id: &str, cents: i64) -> Invoice {
        let invoice = self.new_invoice(client_id, cents).await;
        let req = TestRequest::post()
            .uri(&format!("/api/invoices/{}/payment", invoice.id))
            .set_json(json!({ "chain": "ethereum", "token": "USDT" }));
        let (status, body) = self.send(req).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serde_json::from_str(&body).unwrap()
    }
}
