//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate module.
//!
//! Every handler is asynchronous. Database and collaborator calls are awaited, never blocked on, so a slow custody
//! service only holds up the request that is waiting for it.
use std::str::FromStr;

use actix_web::{get, post, web, HttpResponse, Responder};
use invoice_engine::{
    db_types::InvoiceId,
    events::{InMemoryBus, WalletBalanceEvent, WALLET_BALANCES_TOPIC},
    traits::{MessagePublisher, PublishError},
    InvoiceFlowApi,
    InvoiceManagement,
    UpdateInvoiceRequest,
};
use ipg_common::UsdCents;
use log::*;

use crate::{
    data_objects::{
        GasLimitParams,
        InvoiceSearchParams,
        JsonResponse,
        NewInvoiceParams,
        PaymentChoiceParams,
        StatusUpdateParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Wallet events  ----------------------------------------------------
/// Intake for wallet balance observations.
///
/// The body must be a JSON [`WalletBalanceEvent`]. It is validated here and then handed verbatim to the in-process bus,
/// where the wallet event matcher picks it up. The response does not wait for the event to be matched.
#[post("/events/wallet-balance")]
pub async fn wallet_balance(body: web::Bytes, bus: web::Data<InMemoryBus>) -> Result<HttpResponse, ServerError> {
    let event = WalletBalanceEvent::from_json(&body).map_err(|e| {
        debug!("💻️ Rejected wallet event. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    trace!("💻️ Wallet event for {}: {} {} on {}", event.address, event.balance, event.token, event.chain);
    bus.publish(WALLET_BALANCES_TOPIC, &body).await.map_err(|e| match e {
        PublishError::NoRoute(_) => ServerError::Unavailable("The wallet event matcher is not running".into()),
        e => ServerError::BackendError(e.to_string()),
    })?;
    Ok(HttpResponse::Accepted().json(JsonResponse::success("Wallet event queued")))
}

//----------------------------------------------   Invoices  ----------------------------------------------------
route!(create_invoice => Post "/invoices" impl InvoiceManagement);
pub async fn create_invoice<B: InvoiceManagement>(
    body: web::Json<NewInvoiceParams>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let NewInvoiceParams { client_id, usd_cents_amount } = body.into_inner();
    debug!("💻️ POST new invoice for {client_id}: {usd_cents_amount} cents");
    let invoice = api.create_invoice(client_id, UsdCents::from(usd_cents_amount)).await?;
    Ok(HttpResponse::Created().json(invoice))
}

route!(search_invoices => Get "/invoices" impl InvoiceManagement);
pub async fn search_invoices<B: InvoiceManagement>(
    query: web::Query<InvoiceSearchParams>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET invoices matching {query:?}");
    let invoices = api.list_invoices(query.filter(), query.pagination()).await?;
    Ok(HttpResponse::Ok().json(invoices))
}

route!(invoice_by_id => Get "/invoices/{id}" impl InvoiceManagement);
pub async fn invoice_by_id<B: InvoiceManagement>(
    path: web::Path<String>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = invoice_id(path)?;
    debug!("💻️ GET invoice {id}");
    let invoice = api.check_invoice(&id).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

route!(invoice_payment => Post "/invoices/{id}/payment" impl InvoiceManagement);
/// Chooses the chain and token for a `NEW` invoice. The response carries the deposit address and the token amount.
pub async fn invoice_payment<B: InvoiceManagement>(
    path: web::Path<String>,
    body: web::Json<PaymentChoiceParams>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = invoice_id(path)?;
    let PaymentChoiceParams { chain, token, payer_client_id } = body.into_inner();
    debug!("💻️ POST payment choice for invoice {id}: {token} on {chain}");
    let mut request = UpdateInvoiceRequest::new(id, chain, token);
    if let Some(payer) = payer_client_id {
        request = request.with_payer(payer);
    }
    let invoice = api.update_invoice(request).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

route!(invoice_status => Post "/invoices/{id}/status" impl InvoiceManagement);
pub async fn invoice_status<B: InvoiceManagement>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = invoice_id(path)?;
    let status = body.into_inner().status;
    info!("💻️ POST status override for invoice {id}: {status}");
    let invoice = api.update_invoice_status(&id, status).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

route!(invoice_gas_limit => Post "/invoices/{id}/gas-limit" impl InvoiceManagement);
pub async fn invoice_gas_limit<B: InvoiceManagement>(
    path: web::Path<String>,
    body: web::Json<GasLimitParams>,
    api: web::Data<InvoiceFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = invoice_id(path)?;
    let gas_limit = body.into_inner().gas_limit;
    info!("💻️ POST gas limit for invoice {id}: {gas_limit}");
    let invoice = api.set_gas_limit(&id, gas_limit).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

fn invoice_id(path: web::Path<String>) -> Result<InvoiceId, ServerError> {
    let raw = path.into_inner();
    InvoiceId::from_str(&raw).map_err(|e| ServerError::InvalidRequestPath(format!("{raw} is not an invoice id. {e}")))
}
