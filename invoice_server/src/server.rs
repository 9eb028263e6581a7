use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use invoice_engine::{
    events::InMemoryBus,
    traits::{AlertSink, CustodyService, MessagePublisher, PriceOracle},
    workers::inflight::LocalInFlightTracker,
    InvoiceFlowApi,
    SqliteDatabase,
};
use ipg_common::Secret;
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{AlertClient, CustodyClient, HttpBusPublisher, PriceClient, RestClient},
    routes::{
        health,
        wallet_balance,
        CreateInvoiceRoute,
        InvoiceByIdRoute,
        InvoiceGasLimitRoute,
        InvoicePaymentRoute,
        InvoiceStatusRoute,
        SearchInvoicesRoute,
    },
    workers::{start_workers, Collaborators},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    let timeout = config.collaborator_timeout;
    let endpoints = &config.collaborators;
    let custody: Arc<dyn CustodyService> =
        Arc::new(CustodyClient::new(RestClient::new(&endpoints.custody_url, &endpoints.custody_api_key, timeout)?));
    let prices: Arc<dyn PriceOracle> =
        Arc::new(PriceClient::new(RestClient::new(&endpoints.price_url, &Secret::default(), timeout)?));
    let alerts = match &endpoints.alert_url {
        Some(url) => {
            let client = AlertClient::new(RestClient::new(url, &Secret::default(), timeout)?);
            Some(Arc::new(client) as Arc<dyn AlertSink>)
        },
        None => None,
    };
    let bus = InMemoryBus::new();
    let (publisher, publish_locally) = match &endpoints.bus_url {
        Some(url) => {
            let client = HttpBusPublisher::new(RestClient::new(url, &Secret::default(), timeout)?);
            (Arc::new(client) as Arc<dyn MessagePublisher>, false)
        },
        None => (Arc::new(bus.clone()) as Arc<dyn MessagePublisher>, true),
    };
    let collaborators = Collaborators { custody: custody.clone(), alerts, publisher };
    let tracker = Arc::new(LocalInFlightTracker::new());
    let workers = start_workers(&config, db.clone(), bus.clone(), collaborators, tracker, publish_locally);

    let api = InvoiceFlowApi::new(db.clone(), custody, prices).with_call_timeout(timeout);
    let srv = create_server_instance(&config, api, bus)?;
    // actix stops the server on SIGINT/SIGTERM. The workers are wound down after it.
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    workers.shutdown().await;
    db.close().await;
    info!("🚀️ Server stopped");
    result
}

pub fn create_server_instance(
    config: &ServerConfig,
    api: InvoiceFlowApi<SqliteDatabase>,
    bus: InMemoryBus,
) -> Result<Server, ServerError> {
    let api = web::Data::new(api);
    let bus = web::Data::new(bus);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ipg::access_log"))
            .app_data(api.clone())
            .app_data(bus.clone())
            .configure(configure_routes)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The handlers expect `web::Data<InvoiceFlowApi<SqliteDatabase>>` and `web::Data<InMemoryBus>`
/// in the app data.
pub fn configure_routes(cfg: &mut ServiceConfig) {
    cfg.service(health).service(wallet_balance).service(
        web::scope("/api")
            .service(CreateInvoiceRoute::<SqliteDatabase>::new())
            .service(SearchInvoicesRoute::<SqliteDatabase>::new())
            .service(InvoiceByIdRoute::<SqliteDatabase>::new())
            .service(InvoicePaymentRoute::<SqliteDatabase>::new())
            .service(InvoiceStatusRoute::<SqliteDatabase>::new())
            .service(InvoiceGasLimitRoute::<SqliteDatabase>::new()),
    );
}
